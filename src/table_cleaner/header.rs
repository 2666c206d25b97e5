use crate::table_model::CellValue;

/// Tokens that mark a row as the header of a financial grid
const HEADER_TOKENS: [&str; 13] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec", "total",
];

/// How the header row was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMatch {
    /// A row within the scan window contained a month or `total` token
    Token(usize),
    /// No token row; the row with the most non-null cells was used
    Densest(usize),
}

impl HeaderMatch {
    pub fn index(&self) -> usize {
        match self {
            HeaderMatch::Token(i) | HeaderMatch::Densest(i) => *i,
        }
    }
}

pub struct HeaderDetector {
    scan_rows: usize,
}

impl HeaderDetector {
    pub fn new(scan_rows: usize) -> Self {
        Self { scan_rows }
    }

    /// Find the header row among the first `scan_rows` rows.
    ///
    /// The first row containing a header token wins. Otherwise the densest
    /// row is used, ties going to the topmost. An empty grid yields row 0.
    pub fn detect(&self, cells: &[Vec<CellValue>]) -> HeaderMatch {
        let window = &cells[..cells.len().min(self.scan_rows)];

        if let Some(index) = window.iter().position(|row| Self::looks_like_header(row)) {
            return HeaderMatch::Token(index);
        }

        let mut best = 0;
        let mut best_count = 0;
        for (i, row) in window.iter().enumerate() {
            let count = row.iter().filter(|c| !c.is_null()).count();
            if count > best_count {
                best = i;
                best_count = count;
            }
        }
        HeaderMatch::Densest(best)
    }

    fn looks_like_header(row: &[CellValue]) -> bool {
        row.iter().filter(|c| !c.is_null()).any(|cell| {
            let value = cell.to_string().trim().to_lowercase();
            HEADER_TOKENS.iter().any(|token| value.contains(token))
        })
    }
}

impl Default for HeaderDetector {
    fn default() -> Self {
        Self::new(15)
    }
}
