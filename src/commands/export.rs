//! Export command implementation

use crate::config::Config;
use crate::error::Result;
use crate::progress::ProgressSink;
use crate::render::{export_book, export_file_name, PdfOptions};
use crate::store::ContentStore;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Export options
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Output file; defaults to the configured export directory
    pub output: Option<PathBuf>,
    /// Layout override; defaults to the configured layout
    pub layout: Option<PdfOptions>,
}

/// Result of a synchronous export
#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub book_id: i64,
    pub title: String,
    pub path: PathBuf,
    pub bytes: usize,
}

/// Render a book to a PDF file
pub async fn cmd_export(
    config: &Config,
    store: &ContentStore,
    book_id: i64,
    options: ExportOptions,
    sink: &mut dyn ProgressSink,
) -> Result<ExportResult> {
    info!(book_id, "Exporting book");

    let layout = options.layout.unwrap_or_else(|| config.pdf.layout.clone());
    let (book, bytes) = export_book(store, book_id, &layout, sink).await?;

    let path = match options.output {
        Some(path) => path,
        None => config.paths.export_dir.join(export_file_name(&book)),
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, &bytes).await?;

    Ok(ExportResult {
        book_id,
        title: book.title,
        path,
        bytes: bytes.len(),
    })
}

/// Print export result to console
pub fn print_export(result: &ExportResult) {
    println!(
        "✓ Exported \"{}\" ({} bytes) to {}",
        result.title,
        result.bytes,
        result.path.display()
    );
}
