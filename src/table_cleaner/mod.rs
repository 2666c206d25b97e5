pub mod cleaner;
pub mod detector;
pub mod formatter;
pub mod header;

pub use cleaner::TableCleaner;
pub use detector::{SmartTableDetector, TableRegion};
pub use formatter::{ColumnAlignment, TableFormatter};
pub use header::{HeaderDetector, HeaderMatch};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizationChanges {
    pub header_from_tokens: bool,
    pub columns_dropped: usize,
    pub columns_renamed: usize,
    pub rows_dropped: usize,
    pub cells_filled: usize,
}

impl NormalizationChanges {
    pub fn summary(&self) -> String {
        format!(
            "Header by {}: dropped {} columns and {} rows, renamed {} columns, filled {} cells.",
            if self.header_from_tokens { "token" } else { "density" },
            self.columns_dropped,
            self.rows_dropped,
            self.columns_renamed,
            self.cells_filled
        )
    }
}
