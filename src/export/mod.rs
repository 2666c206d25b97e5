//! Workbook Assembler: classified tables and copied sheets into one xlsx.

pub mod sheet_names;
pub mod verbatim;
pub mod workbook;

pub use sheet_names::{sanitize_sheet_name, SheetNamer, MAX_SHEET_NAME_CHARS};
pub use verbatim::{SheetRenames, StyledWorkbook};
pub use workbook::OutputWorkbook;

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::classifier::Category;
use crate::document::Document;
use crate::error::ConsolidateResult;
use crate::processing::{DocumentFailure, FailureStage};
use crate::table_model::{CellValue, ClassifiedTable, Table};

pub const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SUMMARY_SHEET_NAME: &str = "Summary";

/// What one output sheet will hold
#[derive(Debug, Clone)]
pub enum SheetContent {
    Rendered(ClassifiedTable),
    /// Copy of a source sheet; `fallback` is rendered if the copy fails
    Verbatim {
        sheet_name: String,
        fallback: ClassifiedTable,
    },
    Placeholder { message: String },
}

/// One sheet planned for a document, named `{base}-{suffix}`
#[derive(Debug, Clone)]
pub struct PlannedSheet {
    pub suffix: String,
    pub content: SheetContent,
}

impl PlannedSheet {
    pub fn rendered(suffix: impl Into<String>, table: ClassifiedTable) -> Self {
        Self {
            suffix: suffix.into(),
            content: SheetContent::Rendered(table),
        }
    }

    pub fn verbatim(sheet_name: impl Into<String>, fallback: ClassifiedTable) -> Self {
        let sheet_name = sheet_name.into();
        Self {
            suffix: sheet_name.clone(),
            content: SheetContent::Verbatim { sheet_name, fallback },
        }
    }

    pub fn placeholder(suffix: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            content: SheetContent::Placeholder {
                message: message.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    Verbatim,
    Rendered,
    Placeholder,
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RenderMode::Verbatim => "verbatim",
            RenderMode::Rendered => "rendered",
            RenderMode::Placeholder => "placeholder",
        };
        f.pad(label)
    }
}

/// Manifest line for one written sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetEntry {
    pub name: String,
    pub source: String,
    pub locator: Option<String>,
    pub mode: RenderMode,
    pub category: Option<Category>,
}

/// Builds the output workbook one document at a time, in submission order
pub struct WorkbookAssembler {
    workbook: OutputWorkbook,
    namer: SheetNamer,
    entries: Vec<SheetEntry>,
    summary_sheet: bool,
}

impl WorkbookAssembler {
    pub fn new(summary_sheet: bool) -> Self {
        Self {
            workbook: OutputWorkbook::new(),
            namer: SheetNamer::new(),
            entries: Vec::new(),
            summary_sheet,
        }
    }

    /// Write a document's planned sheets. Copy failures fall back to
    /// rendering and are returned; only workbook-level errors propagate.
    pub fn add_document(
        &mut self,
        document: &Document,
        sheets: Vec<PlannedSheet>,
    ) -> ConsolidateResult<Vec<DocumentFailure>> {
        let source = document.display_name();
        let base = document.base_name();
        let mut failures = Vec::new();
        let mut styled: Option<Result<StyledWorkbook, String>> = None;

        // Names are fixed up front so copied formulas can follow sibling renames
        let names: Vec<String> = sheets
            .iter()
            .map(|planned| self.namer.unique(&format!("{}-{}", base, planned.suffix)))
            .collect();
        let mut renames = SheetRenames::default();
        for (planned, name) in sheets.iter().zip(&names) {
            if let SheetContent::Verbatim { sheet_name, .. } = &planned.content {
                renames.insert(sheet_name, name);
            }
        }

        for (planned, name) in sheets.into_iter().zip(names) {
            debug!(sheet = %name, source = %source, "Adding sheet");

            let entry = match planned.content {
                SheetContent::Rendered(table) => self.render(&name, &table)?,
                SheetContent::Placeholder { message } => {
                    self.workbook.add_message(&name, &message)?;
                    SheetEntry {
                        name,
                        source: source.clone(),
                        locator: None,
                        mode: RenderMode::Placeholder,
                        category: None,
                    }
                }
                SheetContent::Verbatim { sheet_name, fallback } => {
                    let opened = styled.get_or_insert_with(|| {
                        StyledWorkbook::open(&source, &document.content).map_err(|e| e.to_string())
                    });
                    let copied = match opened {
                        Ok(workbook) => workbook
                            .copy_sheet(&sheet_name, &name, &renames, &mut self.workbook)
                            .map_err(|e| e.to_string()),
                        Err(message) => Err(message.clone()),
                    };

                    match copied {
                        Ok(()) => SheetEntry {
                            name,
                            source: source.clone(),
                            locator: fallback.provenance().locator.clone(),
                            mode: RenderMode::Verbatim,
                            category: Some(fallback.category()),
                        },
                        Err(message) => {
                            crate::log_document_failure!(source, FailureStage::Rendering, message);
                            failures.push(DocumentFailure::new(&source, FailureStage::Rendering, message));
                            self.render(&name, &fallback)?
                        }
                    }
                }
            };
            self.entries.push(entry);
        }

        Ok(failures)
    }

    pub fn entries(&self) -> &[SheetEntry] {
        &self.entries
    }

    /// Append the optional summary sheet and serialize
    pub fn finish(mut self) -> ConsolidateResult<(Vec<u8>, Vec<SheetEntry>)> {
        if self.summary_sheet && !self.entries.is_empty() {
            let name = self.namer.unique(SUMMARY_SHEET_NAME);
            let table = summary_table(&self.entries);
            self.workbook.add_table(&name, &table)?;
        }

        let bytes = self.workbook.to_bytes()?;
        Ok((bytes, self.entries))
    }

    fn render(&mut self, name: &str, table: &ClassifiedTable) -> ConsolidateResult<SheetEntry> {
        self.workbook.add_table(name, table.table())?;
        Ok(SheetEntry {
            name: name.to_string(),
            source: table.provenance().document.clone(),
            locator: table.provenance().locator.clone(),
            mode: RenderMode::Rendered,
            category: Some(table.category()),
        })
    }
}

fn summary_table(entries: &[SheetEntry]) -> Table {
    let rows = entries
        .iter()
        .map(|entry| {
            vec![
                CellValue::text(entry.name.clone()),
                CellValue::text(entry.source.clone()),
                CellValue::text(entry.locator.clone().unwrap_or_default()),
                CellValue::text(entry.category.map(|c| c.label()).unwrap_or_default()),
            ]
        })
        .collect();

    Table {
        columns: vec![
            "Sheet".to_string(),
            "Source".to_string(),
            "Locator".to_string(),
            "Category".to_string(),
        ],
        rows,
    }
}
