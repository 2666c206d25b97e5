use lopdf::Document;
use tracing::{debug, info, warn};

use super::pdf_layout::page_layout_text;
use super::TableExtractor;
use crate::error::{ConsolidateError, ConsolidateResult};
use crate::table_cleaner::{SmartTableDetector, TableRegion};
use crate::table_model::{CellValue, RawTable, TableOrigin};

/// One table per page from the page's text layout.
///
/// Page text is rebuilt from glyph positions, so cells placed with their
/// own text moves come out as separate columns.
pub struct PdfExtractor {
    detector: SmartTableDetector,
}

impl PdfExtractor {
    pub fn new(min_rows: usize, min_columns: usize) -> Self {
        Self {
            detector: SmartTableDetector::new(min_rows, min_columns),
        }
    }

    /// Tables from already-extracted page texts, numbered from 1
    pub fn tables_from_pages<'a>(
        &self,
        filename: &str,
        pages: impl IntoIterator<Item = (u32, &'a str)>,
    ) -> Vec<RawTable> {
        let mut tables = Vec::new();
        for (number, text) in pages {
            if let Some(region) = self.detector.detect_primary_table(text) {
                debug!(filename, page = number, rows = region.rows.len(), "Detected table on page");
                tables.push(region_to_raw(filename, number, region));
            }
        }

        if tables.is_empty() {
            info!(filename, "No tables detected in PDF");
            tables.push(RawTable::no_tables_detected(filename));
        }
        tables
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new(2, 2)
    }
}

impl TableExtractor for PdfExtractor {
    fn extract(&self, filename: &str, content: &[u8]) -> ConsolidateResult<Vec<RawTable>> {
        let document = Document::load_mem(content)
            .map_err(|e| ConsolidateError::extraction(filename, format!("unreadable PDF: {}", e)))?;

        let mut page_texts = Vec::new();
        for (number, page_id) in document.get_pages() {
            match page_layout_text(&document, page_id) {
                Ok(text) => page_texts.push((number, text)),
                Err(e) => warn!(filename, page = number, error = %e, "Skipping page with undecodable content"),
            }
        }

        Ok(self.tables_from_pages(filename, page_texts.iter().map(|(n, t)| (*n, t.as_str()))))
    }
}

fn region_to_raw(filename: &str, page: u32, region: TableRegion) -> RawTable {
    let width = region.column_count();
    let cells = region
        .rows
        .into_iter()
        .map(|row| {
            let mut cells: Vec<CellValue> = row.into_iter().map(CellValue::text).collect();
            cells.resize(width, CellValue::Empty);
            cells
        })
        .collect();
    RawTable::new(filename, TableOrigin::Page { number: page }, cells)
}
