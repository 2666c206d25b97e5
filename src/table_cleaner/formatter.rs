use crate::table_model::{CellValue, Table};

/// Renders a table as an aligned pipe table for terminal previews
pub struct TableFormatter {
    padding: usize,
    alignment: ColumnAlignment,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ColumnAlignment {
    Left,
    Center,
    Right,
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            padding: 1,
            alignment: ColumnAlignment::Left,
        }
    }

    pub fn with_alignment(mut self, alignment: ColumnAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Header, separator, then up to `limit` data rows
    pub fn format_table(&self, table: &Table, limit: usize) -> String {
        if table.columns.is_empty() {
            return String::new();
        }

        let rows: Vec<Vec<String>> = table
            .rows
            .iter()
            .take(limit)
            .map(|row| row.iter().map(CellValue::to_string).collect())
            .collect();
        let widths = self.calculate_column_widths(&table.columns, &rows);

        let mut formatted = Vec::with_capacity(rows.len() + 2);
        formatted.push(self.format_row(&table.columns, &widths));
        formatted.push(self.create_separator(&widths));
        for row in &rows {
            formatted.push(self.format_row(row, &widths));
        }

        formatted.join("\n")
    }

    fn calculate_column_widths(&self, header: &[String], rows: &[Vec<String>]) -> Vec<usize> {
        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();

        for row in rows {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        widths
    }

    fn format_row(&self, row: &[String], widths: &[usize]) -> String {
        let cells: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &width)| self.pad_content(row.get(i).map(String::as_str).unwrap_or(""), width))
            .collect();

        let pad = " ".repeat(self.padding);
        format!("|{pad}{}{pad}|", cells.join(&format!("{pad}|{pad}")))
    }

    fn pad_content(&self, content: &str, width: usize) -> String {
        match self.alignment {
            ColumnAlignment::Left => format!("{:<width$}", content, width = width),
            ColumnAlignment::Right => format!("{:>width$}", content, width = width),
            ColumnAlignment::Center => format!("{:^width$}", content, width = width),
        }
    }

    fn create_separator(&self, widths: &[usize]) -> String {
        let separators: Vec<String> = widths
            .iter()
            .map(|&w| "-".repeat(w + self.padding * 2))
            .collect();
        format!("|{}|", separators.join("|"))
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}
