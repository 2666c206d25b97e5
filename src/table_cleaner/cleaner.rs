use std::collections::HashSet;

use super::header::{HeaderDetector, HeaderMatch};
use super::NormalizationChanges;
use crate::table_model::{CellValue, NormalizedTable, RawTable, Table};

/// Prefix pandas-style tools give to header cells they had to invent
const UNNAMED_PREFIX: &str = "Unnamed";

/// Turns a spreadsheet grid with an unknown header into a clean table
pub struct TableCleaner {
    detector: HeaderDetector,
}

impl TableCleaner {
    pub fn new(header_scan_rows: usize) -> Self {
        Self {
            detector: HeaderDetector::new(header_scan_rows),
        }
    }

    pub fn normalize(&self, raw: &RawTable) -> NormalizedTable {
        self.normalize_with_changes(raw).0
    }

    pub fn normalize_with_changes(&self, raw: &RawTable) -> (NormalizedTable, NormalizationChanges) {
        let mut changes = NormalizationChanges::default();
        let header = self.detector.detect(&raw.cells);
        let header_index = header.index();
        changes.header_from_tokens = matches!(header, HeaderMatch::Token(_));

        let width = raw.width();
        let names: Vec<String> = (0..width)
            .map(|col| {
                raw.cells
                    .get(header_index)
                    .and_then(|row| row.get(col))
                    .map(|cell| cell.to_string().trim().to_string())
                    .unwrap_or_default()
            })
            .collect();

        let data: Vec<(usize, &Vec<CellValue>)> =
            raw.cells.iter().enumerate().skip(header_index + 1).collect();

        // Keep columns that have a usable name and at least one value below the header
        let kept: Vec<usize> = (0..width)
            .filter(|&col| {
                let named = !names[col].is_empty() && !names[col].starts_with(UNNAMED_PREFIX);
                let populated = data
                    .iter()
                    .any(|(_, row)| row.get(col).is_some_and(|c| !c.is_null()));
                named && populated
            })
            .collect();
        changes.columns_dropped = width - kept.len();

        let columns = dedupe_names(kept.iter().map(|&col| names[col].clone()), &mut changes);

        let mut rows = Vec::new();
        let mut source_rows = Vec::new();
        for (index, row) in data {
            let projected: Vec<CellValue> = kept
                .iter()
                .map(|&col| row.get(col).cloned().unwrap_or(CellValue::Empty))
                .collect();
            if projected.iter().all(CellValue::is_null) {
                changes.rows_dropped += 1;
                continue;
            }
            rows.push(projected);
            source_rows.push(index);
        }

        changes.cells_filled = forward_fill_first_column(&mut rows);

        tracing::debug!(
            source = %raw.source,
            header_index,
            columns = columns.len(),
            rows = rows.len(),
            "Normalized spreadsheet table"
        );

        let table = NormalizedTable {
            table: Table { columns, rows },
            header_index,
            source_rows,
        };
        (table, changes)
    }
}

impl Default for TableCleaner {
    fn default() -> Self {
        Self::new(15)
    }
}

/// Suffix repeated names with `_1`, `_2`, ... keeping first occurrences intact
fn dedupe_names(names: impl Iterator<Item = String>, changes: &mut NormalizationChanges) -> Vec<String> {
    let names: Vec<String> = names.collect();
    let mut taken: HashSet<String> = HashSet::new();
    let mut result = Vec::with_capacity(names.len());

    for name in names {
        if taken.insert(name.clone()) {
            result.push(name);
            continue;
        }
        let mut counter = 1;
        let unique = loop {
            let candidate = format!("{}_{}", name, counter);
            if !taken.contains(&candidate) {
                break candidate;
            }
            counter += 1;
        };
        taken.insert(unique.clone());
        result.push(unique);
        changes.columns_renamed += 1;
    }

    result
}

/// Fill nulls in column 0 from the nearest non-null value above.
/// Leading nulls stay null.
fn forward_fill_first_column(rows: &mut [Vec<CellValue>]) -> usize {
    let mut last: Option<CellValue> = None;
    let mut filled = 0;

    for row in rows.iter_mut() {
        let Some(cell) = row.first_mut() else { continue };
        if cell.is_null() {
            if let Some(value) = &last {
                *cell = value.clone();
                filled += 1;
            }
        } else {
            last = Some(cell.clone());
        }
    }

    filled
}
