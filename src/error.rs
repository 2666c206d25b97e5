use thiserror::Error;

/// Main error type for the consolidation pipeline
#[derive(Error, Debug)]
pub enum ConsolidateError {
    #[error("No files were submitted")]
    NoFiles,

    #[error("Batch of {total_bytes} bytes exceeds the {limit_bytes} byte limit")]
    BatchTooLarge { total_bytes: u64, limit_bytes: u64 },

    #[error("Failed to extract tables from {filename}: {message}")]
    Extraction {
        filename: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Workbook assembly failed: {message}")]
    Assembly { message: String },

    #[error("File I/O error: {path}")]
    FileIO {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("General error: {0}")]
    General(#[from] anyhow::Error),
}

/// Coarse outcome class for callers that speak HTTP-like status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusHint {
    ClientError,
    ServerError,
}

impl ConsolidateError {
    /// Create an extraction error without an underlying cause
    pub fn extraction(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            filename: filename.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an extraction error wrapping the parser's error
    pub fn extraction_with_source(
        filename: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Extraction {
            filename: filename.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn assembly(message: impl Into<String>) -> Self {
        Self::Assembly {
            message: message.into(),
        }
    }

    pub fn file_io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileIO {
            path: path.into(),
            source,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Per-document failures are recovered locally; everything else ends the batch
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ConsolidateError::Extraction { .. })
    }

    pub fn status_hint(&self) -> StatusHint {
        match self {
            ConsolidateError::NoFiles
            | ConsolidateError::BatchTooLarge { .. }
            | ConsolidateError::Extraction { .. } => StatusHint::ClientError,
            _ => StatusHint::ServerError,
        }
    }

    /// Get user-friendly error message. Never includes filesystem paths.
    pub fn user_message(&self) -> String {
        match self {
            ConsolidateError::NoFiles => "No files uploaded.".to_string(),
            ConsolidateError::BatchTooLarge { limit_bytes, .. } => {
                format!("Upload too large ({} MiB limit).", limit_bytes / (1024 * 1024))
            }
            ConsolidateError::Extraction { filename, .. } => {
                format!("Could not read {}. It might be corrupted or password protected.", filename)
            }
            ConsolidateError::Assembly { message } => {
                format!("Could not build the consolidated workbook: {}", message)
            }
            ConsolidateError::Configuration { message } => {
                format!("Invalid configuration: {}", message)
            }
            _ => "Something went wrong. Check the logs for details.".to_string(),
        }
    }
}

/// Result type alias for convenience
pub type ConsolidateResult<T> = Result<T, ConsolidateError>;
