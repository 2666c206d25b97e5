//! Tabular Extractor: one source document in, zero or more raw tables out.

pub mod delimited;
pub mod pdf;
pub mod pdf_layout;
pub mod spreadsheet;

pub use delimited::DelimitedExtractor;
pub use pdf::PdfExtractor;
pub use spreadsheet::SpreadsheetExtractor;

use crate::config::ExtractionConfig;
use crate::document::DocumentKind;
use crate::error::ConsolidateResult;
use crate::table_model::RawTable;

pub trait TableExtractor: Send + Sync {
    /// Read every table out of `content`. Corrupt input fails with an extraction error.
    fn extract(&self, filename: &str, content: &[u8]) -> ConsolidateResult<Vec<RawTable>>;
}

/// Extractor for a document kind, `None` for unsupported files
pub fn extractor_for(kind: DocumentKind, config: &ExtractionConfig) -> Option<Box<dyn TableExtractor>> {
    match kind {
        DocumentKind::Spreadsheet(format) => Some(Box::new(SpreadsheetExtractor::new(format))),
        DocumentKind::Delimited => Some(Box::new(DelimitedExtractor::new())),
        DocumentKind::Pdf => Some(Box::new(PdfExtractor::new(
            config.pdf_min_table_rows,
            config.pdf_min_columns,
        ))),
        DocumentKind::Unsupported => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SpreadsheetFormat;

    #[test]
    fn test_unsupported_has_no_extractor() {
        let config = ExtractionConfig::default();
        assert!(extractor_for(DocumentKind::Unsupported, &config).is_none());
        assert!(extractor_for(DocumentKind::Pdf, &config).is_some());
        assert!(extractor_for(DocumentKind::Spreadsheet(SpreadsheetFormat::Xls), &config).is_some());
    }
}
