use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConsolidateError, ConsolidateResult};

pub const DEFAULT_OUTPUT_FILENAME: &str = "valuation_consolidated.xlsx";
pub const DEFAULT_MAX_BATCH_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidatorConfig {
    pub extraction: ExtractionConfig,
    pub limits: LimitsConfig,
    pub output: OutputConfig,
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Rows scanned from the top of a sheet when looking for the header
    pub header_scan_rows: usize,

    /// Rows fed to the statement classifier
    pub classify_rows: usize,

    /// Minimum consecutive tabular lines for a PDF table
    pub pdf_min_table_rows: usize,

    /// Minimum columns per line for a PDF table
    pub pdf_min_columns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Total upload size accepted for one batch
    pub max_batch_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub filename: String,

    /// Append a sheet listing every output sheet with its category
    pub summary_sheet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Extract documents on the rayon pool; assembly stays sequential
    pub parallel_documents: bool,
}

impl Default for ConsolidatorConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig::default(),
            limits: LimitsConfig::default(),
            output: OutputConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            header_scan_rows: 15,
            classify_rows: 5,
            pdf_min_table_rows: 2,
            pdf_min_columns: 2,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            filename: DEFAULT_OUTPUT_FILENAME.to_string(),
            summary_sheet: false,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_documents: false,
        }
    }
}

impl ConsolidatorConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConsolidateResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConsolidateError::file_io(path.display().to_string(), e))?;

        let config: ConsolidatorConfig = toml::from_str(&content)
            .map_err(|e| ConsolidateError::configuration(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn load_from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Override fields from `CONSOLIDATOR_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Ok(rows) = std::env::var("CONSOLIDATOR_HEADER_SCAN_ROWS") {
            if let Ok(value) = rows.parse::<usize>() {
                self.extraction.header_scan_rows = value;
            }
        }

        if let Ok(limit) = std::env::var("CONSOLIDATOR_MAX_BATCH_BYTES") {
            if let Ok(value) = limit.parse::<u64>() {
                self.limits.max_batch_bytes = value;
            }
        }

        if let Ok(parallel) = std::env::var("CONSOLIDATOR_PARALLEL") {
            self.processing.parallel_documents = parallel.to_lowercase() == "true";
        }

        if let Ok(summary) = std::env::var("CONSOLIDATOR_SUMMARY_SHEET") {
            self.output.summary_sheet = summary.to_lowercase() == "true";
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> ConsolidateResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConsolidateError::configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConsolidateError::file_io(path.display().to_string(), e))?;

        Ok(())
    }

    pub fn validate(&self) -> ConsolidateResult<()> {
        if self.extraction.header_scan_rows == 0 {
            return Err(ConsolidateError::configuration("extraction.header_scan_rows must be at least 1"));
        }
        if self.limits.max_batch_bytes == 0 {
            return Err(ConsolidateError::configuration("limits.max_batch_bytes must be positive"));
        }
        if self.output.filename.trim().is_empty() {
            return Err(ConsolidateError::configuration("output.filename must not be empty"));
        }
        Ok(())
    }
}
