//! Table types flowing through the pipeline.
//!
//! A [`RawTable`] comes straight out of an extractor. Spreadsheet tables are
//! turned into a [`NormalizedTable`] by the header normalizer; PDF and CSV
//! tables already have their header in row 0 and become a plain [`Table`].
//! Either way the classifier wraps the result into a [`ClassifiedTable`].

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::classifier::Category;

/// One cell as read from the source. `Empty` is the null value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl CellValue {
    /// Text cell, with empty strings collapsed to `Empty`
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }

    /// Parse a delimited-text field, inferring integers and floats
    pub fn infer(field: &str) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return CellValue::Float(f);
            }
        }
        CellValue::Text(field.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{}", *v as i64),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Bool(true) => write!(f, "TRUE"),
            CellValue::Bool(false) => write!(f, "FALSE"),
        }
    }
}

/// Where a raw table came from inside its document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOrigin {
    Sheet { index: usize, name: String },
    Page { number: u32 },
    Delimited,
    /// Stand-in for a PDF that produced no tables at all
    NoTablesDetected,
}

/// How the header row of a raw table is found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPolicy {
    Detect,
    FirstRow,
}

impl TableOrigin {
    pub fn header_policy(&self) -> HeaderPolicy {
        match self {
            TableOrigin::Sheet { .. } => HeaderPolicy::Detect,
            _ => HeaderPolicy::FirstRow,
        }
    }

    /// Suffix appended to the document base name for the output sheet
    pub fn sheet_suffix(&self) -> String {
        match self {
            TableOrigin::Sheet { name, .. } => name.clone(),
            TableOrigin::Page { number } => format!("p{}", number),
            TableOrigin::Delimited => "CSV".to_string(),
            TableOrigin::NoTablesDetected => "PDF".to_string(),
        }
    }

    pub fn locator(&self) -> Option<String> {
        match self {
            TableOrigin::Sheet { name, .. } => Some(format!("sheet {}", name)),
            TableOrigin::Page { number } => Some(format!("page {}", number)),
            TableOrigin::Delimited | TableOrigin::NoTablesDetected => None,
        }
    }
}

/// Unprocessed grid of cells from one sheet, page or file
#[derive(Debug, Clone)]
pub struct RawTable {
    pub source: String,
    pub origin: TableOrigin,
    pub cells: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(source: impl Into<String>, origin: TableOrigin, cells: Vec<Vec<CellValue>>) -> Self {
        Self {
            source: source.into(),
            origin,
            cells,
        }
    }

    pub fn no_tables_detected(source: impl Into<String>) -> Self {
        Self::new(
            source,
            TableOrigin::NoTablesDetected,
            vec![vec![CellValue::text(NO_TABLES_DETECTED)]],
        )
    }

    pub fn width(&self) -> usize {
        self.cells.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Promote row 0 to column names as-is. Used for tables whose header is fixed.
    pub fn into_headed_table(self) -> Table {
        let mut rows = self.cells.into_iter();
        let columns = rows
            .next()
            .map(|header| header.iter().map(|c| c.to_string().trim().to_string()).collect())
            .unwrap_or_default();
        Table {
            columns,
            rows: rows.collect(),
        }
    }
}

pub const NO_TABLES_DETECTED: &str = "No tables detected";

/// Column names plus data rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Header followed by data, as strings; what the classifier reads
    pub fn text_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        std::iter::once(self.columns.clone())
            .chain(self.rows.iter().map(|row| row.iter().map(|c| c.to_string()).collect()))
    }

    /// First `limit` data rows as records keyed by column name
    pub fn records(&self, limit: usize) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                self.columns
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let value = row.get(i).map(CellValue::to_json).unwrap_or(Value::Null);
                        (name.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }
}

/// Spreadsheet table after header detection and cleaning
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub table: Table,
    /// Row of the source grid promoted to the header
    pub header_index: usize,
    /// Source grid row of each data row
    pub source_rows: Vec<usize>,
}

impl NormalizedTable {
    pub fn columns(&self) -> &[String] {
        &self.table.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.table.rows
    }

    pub fn records(&self, limit: usize) -> Vec<Map<String, Value>> {
        self.table.records(limit)
    }
}

/// Source filename plus an optional sheet or page locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub document: String,
    pub locator: Option<String>,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.locator {
            Some(locator) => write!(f, "{} ({})", self.document, locator),
            None => write!(f, "{}", self.document),
        }
    }
}

/// A table tagged with its statement category. The category is fixed at construction.
#[derive(Debug, Clone)]
pub struct ClassifiedTable {
    table: Table,
    category: Category,
    provenance: Provenance,
}

impl ClassifiedTable {
    pub(crate) fn new(table: Table, category: Category, provenance: Provenance) -> Self {
        Self {
            table,
            category,
            provenance,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }
}
