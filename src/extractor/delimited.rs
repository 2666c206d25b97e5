use csv::ReaderBuilder;

use super::TableExtractor;
use crate::error::{ConsolidateError, ConsolidateResult};
use crate::table_model::{CellValue, RawTable, TableOrigin};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Whole file is one table; row 0 is the header
pub struct DelimitedExtractor;

impl DelimitedExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DelimitedExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TableExtractor for DelimitedExtractor {
    fn extract(&self, filename: &str, content: &[u8]) -> ConsolidateResult<Vec<RawTable>> {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content);

        let mut cells = Vec::new();
        for (index, record) in reader.byte_records().enumerate() {
            let record = record
                .map_err(|e| ConsolidateError::extraction_with_source(filename, "malformed delimited text", e))?;
            let row = record
                .iter()
                .map(|field| {
                    let text = String::from_utf8_lossy(field);
                    if index == 0 {
                        CellValue::text(text.trim())
                    } else {
                        CellValue::infer(&text)
                    }
                })
                .collect();
            cells.push(row);
        }

        Ok(vec![RawTable::new(filename, TableOrigin::Delimited, cells)])
    }
}
