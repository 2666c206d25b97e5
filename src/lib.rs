// Public module exports for the binary and integration tests
pub mod classifier;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod extractor;
pub mod logging;
pub mod processing;
pub mod table_cleaner;
pub mod table_model;

pub use classifier::{Category, StatementClassifier};
pub use config::ConsolidatorConfig;
pub use document::{Document, DocumentKind};
pub use error::{ConsolidateError, ConsolidateResult};
pub use processing::{process_batch, BatchOutput, BatchProcessor};
