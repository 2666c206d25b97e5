use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::ConsolidatorConfig;
use crate::document::Document;
use crate::error::ConsolidateError;
use crate::processing::{BatchProcessor, TablePreview};
use crate::table_cleaner::{ColumnAlignment, TableFormatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PreviewFormat {
    Json,
    Table,
}

/// Resolve the configuration: file if given, then `CONSOLIDATOR_*` overrides
pub fn load_config(path: Option<&Path>) -> Result<ConsolidatorConfig> {
    let config = match path {
        Some(path) => {
            let mut config = ConsolidatorConfig::load_from_file(path)?;
            config.apply_env_overrides();
            config
        }
        None => ConsolidatorConfig::load_from_env(),
    };
    config.validate()?;
    Ok(config)
}

/// Read files into documents named by their file name only
pub async fn read_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| ConsolidateError::file_io(path.display().to_string(), e))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        documents.push(Document::new(filename, content));
    }
    Ok(documents)
}

/// Consolidate files into one workbook
pub async fn run_command(files: Vec<PathBuf>, output: Option<PathBuf>, config: ConsolidatorConfig) -> Result<()> {
    let documents = read_documents(&files).await?;
    let processor = BatchProcessor::new(config)?;
    let result = tokio::task::spawn_blocking(move || processor.process_batch(&documents)).await??;

    let output_path = output.unwrap_or_else(|| PathBuf::from(&result.filename));
    tokio::fs::write(&output_path, &result.bytes)
        .await
        .map_err(|e| ConsolidateError::file_io(output_path.display().to_string(), e))?;
    info!("📝 Workbook saved to: {:?}", output_path);

    println!("Wrote {} sheets to {}", result.sheets.len(), output_path.display());
    for sheet in &result.sheets {
        let category = sheet.category.map(|c| c.label()).unwrap_or("-");
        println!("  {:<31}  {:<11}  {:<22}  {}", sheet.name, sheet.mode, category, sheet.source);
    }
    if !result.failures.is_empty() {
        println!("{} problems:", result.failures.len());
        for failure in &result.failures {
            println!("  {} [{}]: {}", failure.filename, failure.stage, failure.message);
        }
    }

    Ok(())
}

/// Print the header-resolved tables of one file
pub async fn preview_command(
    file: PathBuf,
    rows: usize,
    format: PreviewFormat,
    align: ColumnAlignment,
    config: ConsolidatorConfig,
) -> Result<()> {
    let mut documents = read_documents(std::slice::from_ref(&file)).await?;
    let document = documents.remove(0);
    let processor = BatchProcessor::new(config)?;
    let filename = document.display_name();
    let previews = tokio::task::spawn_blocking(move || processor.preview_document(&document, rows)).await??;

    match format {
        PreviewFormat::Json => println!("{}", serde_json::to_string_pretty(&previews)?),
        PreviewFormat::Table => print!("{}", render_previews(&filename, &previews, align)),
    }
    Ok(())
}

/// Print the statement category of every table in each file
pub async fn classify_command(files: Vec<PathBuf>, config: ConsolidatorConfig) -> Result<()> {
    let documents = read_documents(&files).await?;
    let processor = BatchProcessor::new(config)?;

    let lines = tokio::task::spawn_blocking(move || {
        let mut lines = Vec::new();
        for document in &documents {
            let filename = document.display_name();
            match processor.preview_document(document, 0) {
                Ok(previews) => {
                    for preview in previews {
                        let locator = preview.locator.unwrap_or_else(|| "-".to_string());
                        lines.push(format!("{}\t{}\t{}", filename, locator, preview.category));
                    }
                }
                Err(e) => lines.push(format!("{}\t-\tUNSUPPORTED ({})", filename, e.user_message())),
            }
        }
        lines
    })
    .await?;

    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

fn render_previews(filename: &str, previews: &[TablePreview], align: ColumnAlignment) -> String {
    let formatter = TableFormatter::new().with_alignment(align);
    let mut out = String::new();
    for preview in previews {
        let location = preview.locator.as_deref().unwrap_or(filename);
        out.push_str(&format!("== {} [{}]", location, preview.category));
        if let Some(index) = preview.header_index {
            out.push_str(&format!(" header at row {}", index + 1));
        }
        out.push('\n');
        out.push_str(&formatter.format_table(&preview.table, preview.table.rows.len()));
        out.push('\n');
    }
    out
}
