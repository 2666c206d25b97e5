use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::error::{ConsolidateError, ConsolidateResult};

/// Logging configuration for the consolidator
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: PathBuf,
    pub enable_file_logging: bool,
    pub enable_json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            enable_file_logging: false,
            enable_json_format: false,
        }
    }
}

/// Initialize the logging system.
///
/// The returned guard flushes the file writer on drop, so keep it alive
/// for as long as the process logs.
pub fn init_logging(config: &LoggingConfig) -> ConsolidateResult<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Spreadsheet and PDF crates are chatty at debug
        EnvFilter::new(format!(
            "statement_consolidator={},consolidate={},lopdf=warn,{}",
            config.level, config.level, "warn"
        ))
    });

    let registry = Registry::default().with(env_filter);

    fn console_layer<S>() -> Box<dyn Layer<S> + Send + Sync>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .boxed()
    }

    let guard = if config.enable_file_logging {
        fs::create_dir_all(&config.log_dir)
            .map_err(|e| ConsolidateError::file_io(config.log_dir.to_string_lossy().to_string(), e))?;

        let file_appender = rolling::daily(&config.log_dir, "consolidator.log");
        let (file_writer, guard) = non_blocking(file_appender);

        let file_layer = if config.enable_json_format {
            fmt::layer().json().with_writer(file_writer).boxed()
        } else {
            fmt::layer().with_writer(file_writer).with_ansi(false).boxed()
        };

        registry
            .with(file_layer)
            .with(console_layer())
            .try_init()
            .map_err(|e| ConsolidateError::configuration(format!("logging already initialized: {}", e)))?;
        Some(guard)
    } else {
        registry
            .with(console_layer())
            .try_init()
            .map_err(|e| ConsolidateError::configuration(format!("logging already initialized: {}", e)))?;
        None
    };

    info!("📒 Consolidator logging initialized at level {}", config.level);
    if config.enable_file_logging {
        info!("File logging enabled: {}", config.log_dir.display());
    }

    Ok(guard)
}

/// Performance logging utilities
pub struct PerformanceTimer {
    start: std::time::Instant,
    operation: String,
}

impl PerformanceTimer {
    pub fn start(operation: impl Into<String>) -> Self {
        let operation = operation.into();
        tracing::debug!("⏱️  Starting: {}", operation);
        Self {
            start: std::time::Instant::now(),
            operation,
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for PerformanceTimer {
    fn drop(&mut self) {
        info!("⏱️  Completed {}: {}ms", self.operation, self.elapsed_ms());
    }
}

/// Log a recovered per-document failure with its stage
#[macro_export]
macro_rules! log_document_failure {
    ($filename:expr, $stage:expr, $error:expr) => {
        tracing::warn!(
            filename = %$filename,
            stage = %$stage,
            error = %$error,
            "Document downgraded to placeholder sheet"
        );
    };
}

#[macro_export]
macro_rules! log_document_start {
    ($filename:expr, $kind:expr, $size:expr) => {
        tracing::info!(
            filename = %$filename,
            kind = ?$kind,
            size_bytes = $size,
            "Processing document"
        );
    };
}
