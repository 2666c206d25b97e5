use std::io::Cursor;
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::error::{ConsolidateError, ConsolidateResult};
use crate::table_model::{CellValue, Table};

/// The consolidated workbook under construction. Sheets keep insertion order.
pub struct OutputWorkbook {
    book: Spreadsheet,
}

impl OutputWorkbook {
    pub fn new() -> Self {
        Self {
            book: umya_spreadsheet::new_file_empty_worksheet(),
        }
    }

    /// Plain sheet: column names in row 1, data from row 2
    pub fn add_table(&mut self, name: &str, table: &Table) -> ConsolidateResult<()> {
        let sheet = self.new_sheet(name)?;

        for (col, header) in table.columns.iter().enumerate() {
            if !header.is_empty() {
                sheet.get_cell_mut((col as u32 + 1, 1)).set_value_string(header.clone());
            }
        }
        for (row_index, row) in table.rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                write_cell(sheet, (col as u32 + 1, row_index as u32 + 2), value);
            }
        }
        Ok(())
    }

    /// Sheet holding a single message in A1
    pub fn add_message(&mut self, name: &str, message: &str) -> ConsolidateResult<()> {
        let sheet = self.new_sheet(name)?;
        sheet.get_cell_mut((1, 1)).set_value_string(message.to_string());
        Ok(())
    }

    pub(crate) fn push_sheet(&mut self, sheet: Worksheet) -> ConsolidateResult<()> {
        let name = sheet.get_name().to_string();
        self.book
            .add_sheet(sheet)
            .map_err(|e| ConsolidateError::assembly(format!("cannot add sheet '{}': {}", name, e)))?;
        Ok(())
    }

    pub fn sheet_count(&self) -> usize {
        self.book.get_sheet_count()
    }

    pub fn spreadsheet(&self) -> &Spreadsheet {
        &self.book
    }

    /// Serialize as xlsx. A workbook without sheets cannot be written.
    pub fn to_bytes(&self) -> ConsolidateResult<Vec<u8>> {
        if self.sheet_count() == 0 {
            return Err(ConsolidateError::assembly("workbook has no sheets"));
        }

        let mut cursor = Cursor::new(Vec::new());
        umya_spreadsheet::writer::xlsx::write_writer(&self.book, &mut cursor)
            .map_err(|e| ConsolidateError::assembly(format!("failed to serialize workbook: {}", e)))?;
        Ok(cursor.into_inner())
    }

    fn new_sheet(&mut self, name: &str) -> ConsolidateResult<&mut Worksheet> {
        self.book
            .new_sheet(name)
            .map_err(|e| ConsolidateError::assembly(format!("cannot add sheet '{}': {}", name, e)))
    }
}

impl Default for OutputWorkbook {
    fn default() -> Self {
        Self::new()
    }
}

fn write_cell(sheet: &mut Worksheet, coordinate: (u32, u32), value: &CellValue) {
    match value {
        CellValue::Empty => {}
        CellValue::Text(text) => {
            sheet.get_cell_mut(coordinate).set_value_string(text.clone());
        }
        CellValue::Int(i) => {
            sheet.get_cell_mut(coordinate).set_value_number(*i as f64);
        }
        CellValue::Float(f) => {
            sheet.get_cell_mut(coordinate).set_value_number(*f);
        }
        CellValue::Bool(b) => {
            sheet.get_cell_mut(coordinate).set_value_bool(*b);
        }
    }
}
