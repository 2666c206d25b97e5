use calamine::{open_workbook_from_rs, Data, Range, Reader, Xls, Xlsx};
use std::io::{Cursor, Read, Seek};
use tracing::debug;

use super::TableExtractor;
use crate::document::SpreadsheetFormat;
use crate::error::{ConsolidateError, ConsolidateResult};
use crate::table_model::{CellValue, RawTable, TableOrigin};

/// Reads each worksheet's full value grid, no header assumed
pub struct SpreadsheetExtractor {
    format: SpreadsheetFormat,
}

impl SpreadsheetExtractor {
    pub fn new(format: SpreadsheetFormat) -> Self {
        Self { format }
    }
}

impl TableExtractor for SpreadsheetExtractor {
    fn extract(&self, filename: &str, content: &[u8]) -> ConsolidateResult<Vec<RawTable>> {
        let cursor = Cursor::new(content);
        match self.format {
            SpreadsheetFormat::Xlsx => {
                let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)
                    .map_err(|e| ConsolidateError::extraction(filename, format!("unreadable xlsx workbook: {}", e)))?;
                read_sheets(&mut workbook, filename)
            }
            SpreadsheetFormat::Xls => {
                let mut workbook: Xls<_> = open_workbook_from_rs(cursor)
                    .map_err(|e| ConsolidateError::extraction(filename, format!("unreadable xls workbook: {}", e)))?;
                read_sheets(&mut workbook, filename)
            }
        }
    }
}

fn read_sheets<RS, R>(workbook: &mut R, filename: &str) -> ConsolidateResult<Vec<RawTable>>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let mut tables = Vec::new();

    for (index, name) in workbook.sheet_names().into_iter().enumerate() {
        let range = workbook.worksheet_range(&name).map_err(|e| {
            ConsolidateError::extraction(filename, format!("unreadable sheet '{}': {}", name, e))
        })?;
        let cells = grid_from_range(&range);
        debug!(filename, sheet = %name, rows = cells.len(), "Read worksheet grid");
        tables.push(RawTable::new(filename, TableOrigin::Sheet { index, name }, cells));
    }

    Ok(tables)
}

/// Grid anchored at A1 so row indices match the sheet
fn grid_from_range(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let Some((first_row, first_col)) = range.start() else {
        return Vec::new();
    };

    let mut grid: Vec<Vec<CellValue>> = vec![Vec::new(); first_row as usize];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; first_col as usize];
        cells.extend(row.iter().map(cell_from_data));
        grid.push(cells);
    }
    grid
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        // Serial date number, as Excel stores it
        Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_is_anchored_at_a1() {
        let mut range: Range<Data> = Range::new((2, 1), (3, 2));
        range.set_value((2, 1), Data::String("Account".into()));
        range.set_value((2, 2), Data::String("Jan".into()));
        range.set_value((3, 1), Data::String("Cash".into()));
        range.set_value((3, 2), Data::Float(10.0));

        let grid = grid_from_range(&range);
        assert_eq!(grid.len(), 4);
        assert!(grid[0].is_empty());
        assert_eq!(grid[2][0], CellValue::Empty);
        assert_eq!(grid[2][1], CellValue::text("Account"));
        assert_eq!(grid[3][2], CellValue::Float(10.0));
    }

    #[test]
    fn test_empty_strings_are_null() {
        assert_eq!(cell_from_data(&Data::String(String::new())), CellValue::Empty);
        assert_eq!(cell_from_data(&Data::Int(7)), CellValue::Int(7));
    }

    #[test]
    fn test_garbage_bytes_fail_with_filename() {
        let extractor = SpreadsheetExtractor::new(SpreadsheetFormat::Xlsx);
        let err = extractor.extract("broken.xlsx", b"not a zip archive").unwrap_err();
        match err {
            ConsolidateError::Extraction { filename, .. } => assert_eq!(filename, "broken.xlsx"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
