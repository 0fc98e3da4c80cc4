//! Import command implementation

use crate::error::{Error, Result};
use crate::store::{ContentStore, ImportBundle, ImportStats};
use std::path::Path;
use tracing::info;

/// Load a JSON bundle of languages, books and chapters into the store
pub async fn cmd_import(store: &ContentStore, path: &Path) -> Result<ImportStats> {
    info!("Importing bundle from {:?}", path);

    if !path.exists() {
        return Err(Error::InvalidInput(format!(
            "Bundle not found: {}",
            path.display()
        )));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let bundle: ImportBundle = serde_json::from_str(&content)?;
    store.import_bundle(&bundle).await
}

/// Print import stats to console
pub fn print_import_stats(stats: &ImportStats) {
    println!("\n✓ Import complete");
    println!("  Languages: {}", stats.languages);
    println!("  Books: {}", stats.books);
    println!("  Paragraphs: {}", stats.paragraphs);
    println!("  Books with full text: {}", stats.books_completed);
}
