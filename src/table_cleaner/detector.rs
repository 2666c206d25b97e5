/// Finds tables in page text laid out with column gaps.
///
/// A line is tabular when it splits into enough segments on pipes, tabs or
/// runs of three or more spaces. Consecutive tabular lines form a region;
/// the region with the most cells is the page's table.
pub struct SmartTableDetector {
    min_rows: usize,
    min_columns: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRegion {
    pub start_line: usize,
    pub end_line: usize,
    pub rows: Vec<Vec<String>>,
}

impl TableRegion {
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }
}

impl SmartTableDetector {
    pub fn new(min_rows: usize, min_columns: usize) -> Self {
        Self {
            min_rows: min_rows.max(1),
            min_columns: min_columns.max(1),
        }
    }

    /// All candidate regions in top-to-bottom order
    pub fn detect_tables(&self, content: &str) -> Vec<TableRegion> {
        let mut regions = Vec::new();
        let mut current: Option<TableRegion> = None;

        for (i, line) in content.lines().enumerate() {
            let segments = extract_segments(line);

            if segments.len() >= self.min_columns {
                let region = current.get_or_insert_with(|| TableRegion {
                    start_line: i,
                    end_line: i,
                    rows: Vec::new(),
                });
                region.end_line = i;
                region.rows.push(segments);
            } else if let Some(region) = current.take() {
                self.keep_region(region, &mut regions);
            }
        }

        // Don't forget region at end of page
        if let Some(region) = current {
            self.keep_region(region, &mut regions);
        }

        regions
    }

    /// The largest region, first one winning ties
    pub fn detect_primary_table(&self, content: &str) -> Option<TableRegion> {
        let mut best: Option<TableRegion> = None;
        for region in self.detect_tables(content) {
            let better = best
                .as_ref()
                .map_or(true, |b| region.cell_count() > b.cell_count());
            if better {
                best = Some(region);
            }
        }
        best
    }

    fn keep_region(&self, region: TableRegion, regions: &mut Vec<TableRegion>) {
        if region.rows.len() >= self.min_rows {
            regions.push(region);
        }
    }
}

impl Default for SmartTableDetector {
    fn default() -> Self {
        Self::new(2, 2)
    }
}

/// Split a line into trimmed, non-empty segments
pub fn extract_segments(line: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '|' | '\t' => {
                push_segment(&mut segments, &mut current);
                i += 1;
            }
            ' ' if i + 2 < chars.len() && chars[i + 1] == ' ' && chars[i + 2] == ' ' => {
                push_segment(&mut segments, &mut current);
                while i < chars.len() && chars[i] == ' ' {
                    i += 1;
                }
            }
            c => {
                current.push(c);
                i += 1;
            }
        }
    }
    push_segment(&mut segments, &mut current);

    segments
}

fn push_segment(segments: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
    current.clear();
}
