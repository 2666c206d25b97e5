use std::collections::HashMap;
use std::io::Cursor;
use umya_spreadsheet::Spreadsheet;

use super::OutputWorkbook;
use crate::error::{ConsolidateError, ConsolidateResult};

/// Source sheet names mapped to their names in the output workbook.
/// Lookups ignore case, as sheet references in formulas do.
#[derive(Debug, Clone, Default)]
pub struct SheetRenames {
    names: HashMap<String, String>,
}

impl SheetRenames {
    pub fn insert(&mut self, source: &str, output: &str) {
        self.names.insert(source.to_lowercase(), output.to_string());
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.names.get(&source.to_lowercase()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A source xlsx workbook whose sheets can be copied with all formatting.
///
/// Values, formulas, styles, merged ranges, column widths and row heights
/// travel with the worksheet, so a copy reopens identical to the original.
/// Formulas that name a renamed sibling sheet are pointed at its new name.
pub struct StyledWorkbook {
    filename: String,
    book: Spreadsheet,
}

impl StyledWorkbook {
    pub fn open(filename: &str, content: &[u8]) -> ConsolidateResult<Self> {
        let book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(content), true)
            .map_err(|e| ConsolidateError::extraction(filename, format!("cannot read workbook styles: {}", e)))?;
        Ok(Self {
            filename: filename.to_string(),
            book,
        })
    }

    /// Copy `sheet_name` into `target` under `target_name`
    pub fn copy_sheet(
        &self,
        sheet_name: &str,
        target_name: &str,
        renames: &SheetRenames,
        target: &mut OutputWorkbook,
    ) -> ConsolidateResult<()> {
        let mut sheet = self
            .book
            .get_sheet_by_name(sheet_name)
            .ok_or_else(|| {
                ConsolidateError::extraction(&self.filename, format!("sheet '{}' not found", sheet_name))
            })?
            .clone();
        sheet.set_name(target_name);

        if !renames.is_empty() {
            for cell in sheet.get_cell_collection_mut() {
                if !cell.is_formula() {
                    continue;
                }
                let rewritten = rewrite_sheet_references(cell.get_formula(), renames);
                if rewritten != cell.get_formula() {
                    cell.set_formula(rewritten);
                }
            }
        }
        target.push_sheet(sheet)
    }
}

/// Point `Name!` and `'Name'!` references at renamed sheets.
///
/// String literals and external workbook references (`[1]Name!`) are left
/// as written, as are references to sheets not in `renames`.
pub fn rewrite_sheet_references(formula: &str, renames: &SheetRenames) -> String {
    let chars: Vec<char> = formula.chars().collect();
    let mut out = String::with_capacity(formula.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            quote @ ('"' | '\'') => {
                let Some((name, end)) = quoted(&chars, i, quote) else {
                    out.extend(&chars[i..]);
                    break;
                };
                match renames.get(&name) {
                    Some(renamed) if quote == '\'' && chars.get(end) == Some(&'!') => {
                        out.push_str(&quote_sheet_name(renamed));
                    }
                    _ => out.extend(&chars[i..end]),
                }
                i = end;
            }
            '[' => {
                let close = chars[i..].iter().position(|&c| c == ']').map_or(chars.len(), |p| i + p + 1);
                let end = name_end(&chars, close);
                out.extend(&chars[i..end]);
                i = end;
            }
            c if c.is_alphabetic() || c == '_' => {
                let end = name_end(&chars, i);
                let name: String = chars[i..end].iter().collect();
                match renames.get(&name) {
                    Some(renamed) if chars.get(end) == Some(&'!') => out.push_str(&quote_sheet_name(renamed)),
                    _ => out.push_str(&name),
                }
                i = end;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Unescaped body of a quoted token starting at `start`, and the index past it
fn quoted(chars: &[char], start: usize, quote: char) -> Option<(String, usize)> {
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                text.push(quote);
                i += 2;
                continue;
            }
            return Some((text, i + 1));
        }
        text.push(chars[i]);
        i += 1;
    }
    None
}

fn name_end(chars: &[char], start: usize) -> usize {
    let mut end = start;
    while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_' || chars[end] == '.') {
        end += 1;
    }
    end
}

fn quote_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}
