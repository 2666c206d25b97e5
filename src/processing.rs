use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, info};

use crate::classifier::{Category, StatementClassifier};
use crate::config::ConsolidatorConfig;
use crate::document::{Document, DocumentKind, SpreadsheetFormat};
use crate::error::{ConsolidateError, ConsolidateResult};
use crate::export::{PlannedSheet, SheetEntry, WorkbookAssembler, XLSX_CONTENT_TYPE};
use crate::extractor::extractor_for;
use crate::logging::PerformanceTimer;
use crate::table_cleaner::TableCleaner;
use crate::table_model::{ClassifiedTable, HeaderPolicy, Provenance, RawTable, Table};
use crate::{log_document_failure, log_document_start};

const UNSUPPORTED_SUFFIX: &str = "UNSUPPORTED";

/// Pipeline stage at which a document was downgraded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Extension not handled
    Dispatch,
    Extraction,
    Rendering,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureStage::Dispatch => "dispatch",
            FailureStage::Extraction => "extraction",
            FailureStage::Rendering => "rendering",
        };
        write!(f, "{}", label)
    }
}

/// A document problem that was recovered from without aborting the batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentFailure {
    pub filename: String,
    pub stage: FailureStage,
    pub message: String,
}

impl DocumentFailure {
    pub fn new(filename: &str, stage: FailureStage, message: impl Into<String>) -> Self {
        Self {
            filename: filename.to_string(),
            stage,
            message: message.into(),
        }
    }
}

/// Everything decided about one document before it touches the workbook
#[derive(Debug, Clone)]
pub struct DocumentPlan {
    pub sheets: Vec<PlannedSheet>,
    pub failures: Vec<DocumentFailure>,
}

impl DocumentPlan {
    fn unsupported(failure: DocumentFailure, message: impl Into<String>) -> Self {
        Self {
            sheets: vec![PlannedSheet::placeholder(UNSUPPORTED_SUFFIX, message)],
            failures: vec![failure],
        }
    }
}

/// Result of a batch: the serialized workbook plus what went into it
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutput {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
    pub sheets: Vec<SheetEntry>,
    pub failures: Vec<DocumentFailure>,
}

/// Header-resolved view of one extracted table
#[derive(Debug, Clone, Serialize)]
pub struct TablePreview {
    pub locator: Option<String>,
    /// Source row promoted to the header, for spreadsheet tables
    pub header_index: Option<usize>,
    pub category: Category,
    pub columns: Vec<String>,
    pub records: Vec<Map<String, Value>>,
    /// Same rows as `records`, for text rendering
    #[serde(skip)]
    pub table: Table,
}

/// Runs extraction, normalization, classification and assembly over a batch
pub struct BatchProcessor {
    config: ConsolidatorConfig,
    cleaner: TableCleaner,
    classifier: StatementClassifier,
}

impl BatchProcessor {
    pub fn new(config: ConsolidatorConfig) -> ConsolidateResult<Self> {
        let cleaner = TableCleaner::new(config.extraction.header_scan_rows);
        let classifier = StatementClassifier::new(config.extraction.classify_rows)?;
        Ok(Self {
            config,
            cleaner,
            classifier,
        })
    }

    pub fn config(&self) -> &ConsolidatorConfig {
        &self.config
    }

    /// Consolidate a batch into one workbook.
    ///
    /// Sheets appear in submission order, then sheet/page order within each
    /// document. Per-document problems become placeholder sheets and are
    /// listed in `failures`; only an empty or oversized batch, or a workbook
    /// that cannot be written, is an error.
    pub fn process_batch(&self, documents: &[Document]) -> ConsolidateResult<BatchOutput> {
        if documents.is_empty() {
            return Err(ConsolidateError::NoFiles);
        }

        let total_bytes: u64 = documents.iter().map(|d| d.content.len() as u64).sum();
        let limit_bytes = self.config.limits.max_batch_bytes;
        if total_bytes > limit_bytes {
            return Err(ConsolidateError::BatchTooLarge {
                total_bytes,
                limit_bytes,
            });
        }

        let _timer = PerformanceTimer::start(format!("consolidating {} documents", documents.len()));
        info!("📚 Consolidating {} documents ({} bytes)", documents.len(), total_bytes);

        // Indexed collect keeps submission order regardless of completion order
        let plans: Vec<DocumentPlan> = if self.config.processing.parallel_documents {
            documents.par_iter().map(|d| self.plan_document(d)).collect()
        } else {
            documents.iter().map(|d| self.plan_document(d)).collect()
        };

        let mut assembler = WorkbookAssembler::new(self.config.output.summary_sheet);
        let mut failures = Vec::new();
        for (document, plan) in documents.iter().zip(plans) {
            failures.extend(plan.failures);
            failures.extend(assembler.add_document(document, plan.sheets)?);
        }

        let (bytes, sheets) = assembler.finish()?;
        info!(
            "✅ Wrote {} sheets ({} bytes), {} documents downgraded",
            sheets.len(),
            bytes.len(),
            failures.len()
        );

        Ok(BatchOutput {
            bytes,
            filename: self.config.output.filename.clone(),
            content_type: XLSX_CONTENT_TYPE.to_string(),
            sheets,
            failures,
        })
    }

    /// Extract, normalize and classify one document. Never fails: problems
    /// become an `UNSUPPORTED` placeholder plus a recorded failure.
    pub fn plan_document(&self, document: &Document) -> DocumentPlan {
        let filename = document.display_name();
        let kind = document.kind();
        log_document_start!(filename, kind, document.content.len());
        let _timer = PerformanceTimer::start(format!("planning {}", filename));

        let raw_tables = match self.extract(&filename, kind, &document.content) {
            Ok(tables) => tables,
            Err((stage, error)) => {
                log_document_failure!(filename, stage, error);
                let message = match stage {
                    FailureStage::Dispatch => format!("Unsupported file type: {}", filename),
                    _ => error.user_message(),
                };
                let failure = DocumentFailure::new(&filename, stage, error.to_string());
                return DocumentPlan::unsupported(failure, message);
            }
        };

        let sheets = raw_tables
            .into_iter()
            .map(|raw| self.plan_table(&filename, kind, raw))
            .collect();

        DocumentPlan {
            sheets,
            failures: Vec::new(),
        }
    }

    /// Header-resolved tables of one document with their first `rows` records
    pub fn preview_document(&self, document: &Document, rows: usize) -> ConsolidateResult<Vec<TablePreview>> {
        let filename = document.display_name();
        let kind = document.kind();
        let raw_tables = self
            .extract(&filename, kind, &document.content)
            .map_err(|(_, error)| error)?;

        Ok(raw_tables
            .into_iter()
            .map(|raw| {
                let (classified, header_index) = self.classify_raw(&filename, raw);
                let table = classified.table();
                TablePreview {
                    locator: classified.provenance().locator.clone(),
                    header_index,
                    category: classified.category(),
                    columns: table.columns.clone(),
                    records: table.records(rows),
                    table: Table {
                        columns: table.columns.clone(),
                        rows: table.rows.iter().take(rows).cloned().collect(),
                    },
                }
            })
            .collect())
    }

    fn extract(
        &self,
        filename: &str,
        kind: DocumentKind,
        content: &[u8],
    ) -> Result<Vec<RawTable>, (FailureStage, ConsolidateError)> {
        let extractor = extractor_for(kind, &self.config.extraction).ok_or_else(|| {
            (
                FailureStage::Dispatch,
                ConsolidateError::extraction(filename, "unsupported file type"),
            )
        })?;
        extractor
            .extract(filename, content)
            .map_err(|e| (FailureStage::Extraction, e))
    }

    fn plan_table(&self, filename: &str, kind: DocumentKind, raw: RawTable) -> PlannedSheet {
        let suffix = raw.origin.sheet_suffix();
        let (classified, _) = self.classify_raw(filename, raw);

        match kind {
            DocumentKind::Spreadsheet(SpreadsheetFormat::Xlsx) => PlannedSheet::verbatim(suffix, classified),
            _ => PlannedSheet::rendered(suffix, classified),
        }
    }

    /// Spreadsheet grids go through header detection; other tables keep row 0
    fn classify_raw(&self, filename: &str, raw: RawTable) -> (ClassifiedTable, Option<usize>) {
        let provenance = Provenance {
            document: filename.to_string(),
            locator: raw.origin.locator(),
        };

        match raw.origin.header_policy() {
            HeaderPolicy::Detect => {
                let (normalized, changes) = self.cleaner.normalize_with_changes(&raw);
                debug!(source = %provenance, header_index = normalized.header_index, "{}", changes.summary());
                let header_index = normalized.header_index;
                (self.classifier.classify(normalized.table, provenance), Some(header_index))
            }
            HeaderPolicy::FirstRow => (self.classifier.classify(raw.into_headed_table(), provenance), None),
        }
    }
}

/// Consolidate with the default configuration
pub fn process_batch(documents: &[Document]) -> ConsolidateResult<BatchOutput> {
    BatchProcessor::new(ConsolidatorConfig::default())?.process_batch(documents)
}
