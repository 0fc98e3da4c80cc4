//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::store::{CategoryCount, ContentStore, StoreStats};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub export_dir: String,
    pub stats: StoreStats,
    pub categories: Vec<CategoryCount>,
}

/// Get library status
pub async fn cmd_status(config: &Config, store: &ContentStore) -> Result<StatusInfo> {
    info!("Getting status");

    let stats = store.get_stats().await?;
    let categories = store.get_categories().await?;

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        export_dir: config.paths.export_dir.display().to_string(),
        stats,
        categories,
    })
}

/// Markdown rendering shared by the CLI and the MCP server
pub fn format_status(status: &StatusInfo) -> String {
    let mut output = format!(
        "Library Status:\n\n\
         **Paths:**\n\
         - Configuration: {}\n\
         - Database: {}\n\
         - Exports: {}\n\n\
         **Content:**\n\
         - Languages: {}\n\
         - Books: {}\n\
         - Downloaded books: {}\n\
         - Paragraphs: {}\n",
        status.config_path,
        status.db_path,
        status.export_dir,
        status.stats.language_count,
        status.stats.book_count,
        status.stats.downloaded_book_count,
        status.stats.paragraph_count,
    );

    if !status.categories.is_empty() {
        output.push_str("\n**Categories:**\n");
        for c in &status.categories {
            output.push_str(&format!("- {}/{}: {}\n", c.category, c.subcategory, c.count));
        }
    }

    output
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n{}", format_status(status));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BookRecord;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_status_counts() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        let store = ContentStore::connect(&config).await.unwrap();

        store
            .insert_book(&BookRecord {
                book_id: 1,
                code: "SC".into(),
                lang: "en".into(),
                book_type: "book".into(),
                title: "Steps to Christ".into(),
                author: Some("Ellen G. White".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let status = cmd_status(&config, &store).await.unwrap();
        assert_eq!(status.stats.book_count, 1);
        assert_eq!(status.categories.len(), 1);

        let text = format_status(&status);
        assert!(text.contains("- Books: 1"));
        assert!(text.contains("- egw/books: 1"));
    }
}
