use std::collections::HashSet;

/// Excel's limit on sheet name length, in characters
pub const MAX_SHEET_NAME_CHARS: usize = 31;

const FORBIDDEN_CHARS: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];

const FALLBACK_NAME: &str = "Sheet";

/// Strip forbidden characters and truncate to 31 characters
pub fn sanitize_sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c) && !c.is_control())
        .collect();
    let truncated: String = cleaned.trim().chars().take(MAX_SHEET_NAME_CHARS).collect();

    // Excel also rejects names starting or ending with an apostrophe
    let name = truncated.trim_matches('\'').trim();
    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Hands out sanitized names, unique without regard to case
#[derive(Debug, Default)]
pub struct SheetNamer {
    taken: HashSet<String>,
}

impl SheetNamer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unique(&mut self, raw: &str) -> String {
        let base = sanitize_sheet_name(raw);
        if self.taken.insert(base.to_lowercase()) {
            return base;
        }

        let mut counter = 2;
        loop {
            let suffix = format!("_{}", counter);
            let keep = MAX_SHEET_NAME_CHARS - suffix.chars().count();
            let stem: String = base.chars().take(keep).collect();
            let candidate = format!("{}{}", stem.trim_end(), suffix);
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
            counter += 1;
        }
    }
}
