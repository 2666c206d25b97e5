use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

use statement_consolidator::cli::{self, PreviewFormat};
use statement_consolidator::error::StatusHint;
use statement_consolidator::logging::{init_logging, LoggingConfig};
use statement_consolidator::table_cleaner::ColumnAlignment;
use statement_consolidator::ConsolidateError;

#[derive(Parser)]
#[command(name = "consolidate")]
#[command(about = "Consolidate financial statements from spreadsheets, CSV and PDF into one workbook")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for this crate
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Also write JSON logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the consolidated workbook
    Run {
        /// Input documents, in sheet order
        files: Vec<PathBuf>,

        /// Output path (defaults to valuation_consolidated.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the tables found in one document
    Preview {
        file: PathBuf,

        /// Data rows per table
        #[arg(long, default_value_t = 5)]
        rows: usize,

        #[arg(long, value_enum, default_value_t = PreviewFormat::Table)]
        format: PreviewFormat,

        /// Cell alignment for table output
        #[arg(long, value_enum, default_value_t = ColumnAlignment::Left)]
        align: ColumnAlignment,
    },
    /// Print the statement category of every table
    Classify { files: Vec<PathBuf> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: cli.log_level.clone(),
        enable_file_logging: cli.log_dir.is_some(),
        enable_json_format: true,
        log_dir: cli.log_dir.clone().unwrap_or_else(|| PathBuf::from("logs")),
    };
    let _guard = init_logging(&logging)?;

    let config = cli::load_config(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Run { files, output } => cli::run_command(files, output, config).await,
        Commands::Preview { file, rows, format, align } => {
            cli::preview_command(file, rows, format, align, config).await
        }
        Commands::Classify { files } => cli::classify_command(files, config).await,
    };

    if let Err(err) = result {
        if let Some(consolidate_error) = err.downcast_ref::<ConsolidateError>() {
            error!("{:?}", consolidate_error);
            eprintln!("❌ {}", consolidate_error.user_message());
            let code = match consolidate_error.status_hint() {
                StatusHint::ClientError => 2,
                StatusHint::ServerError => 1,
            };
            std::process::exit(code);
        }
        return Err(err);
    }

    Ok(())
}
