//! Search command implementation

use crate::config::Config;
use crate::error::Result;
use crate::store::{ContentStore, SearchHit};
use serde::Serialize;
use tracing::info;

/// Search options
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Number of results to return (clamped to the configured maximum)
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Search result for display
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub query: String,
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
    pub hits: Vec<SearchHit>,
}

/// Run a full-text search
pub async fn cmd_search(
    config: &Config,
    store: &ContentStore,
    query: &str,
    options: SearchOptions,
) -> Result<SearchResult> {
    info!("Searching: {}", query);

    let limit = options
        .limit
        .unwrap_or(config.search.default_limit)
        .min(config.search.max_limit);
    let offset = options.offset.unwrap_or(0);

    let hits = store.search(query, limit, offset).await?;
    let total = store.search_count(query).await?;

    Ok(SearchResult {
        query: query.to_string(),
        total,
        limit,
        offset,
        hits,
    })
}

/// Markdown rendering shared by the CLI and the MCP server
pub fn format_search_results(result: &SearchResult) -> String {
    if result.total == 0 {
        return format!("No results found for \"{}\".", result.query);
    }
    if result.hits.is_empty() {
        return format!(
            "Found {} matches for \"{}\"; offset {} is past the last result.",
            result.total, result.query, result.offset
        );
    }

    let first = result.offset as usize + 1;
    let last = result.offset as usize + result.hits.len();
    let mut output = format!(
        "Found {} matches for \"{}\" (showing {}-{}):\n\n",
        result.total, result.query, first, last
    );

    for (i, hit) in result.hits.iter().enumerate() {
        let reference = hit
            .refcode_short
            .as_deref()
            .or(hit.refcode_long.as_deref())
            .unwrap_or(hit.para_id.as_str());
        output.push_str(&format!("## {}. {} ({})\n", first + i, hit.book_title, reference));

        let mut byline = Vec::new();
        if let Some(author) = &hit.book_author {
            byline.push(author.clone());
        }
        if let Some(year) = &hit.book_pub_year {
            byline.push(year.clone());
        }
        if let Some(chapter) = &hit.chapter_title {
            byline.push(format!("chapter: {}", chapter));
        }
        if !byline.is_empty() {
            output.push_str(&format!("*{}*\n", byline.join(", ")));
        }
        output.push_str(&format!(
            "Book ID: {}, paragraph: {}\n\n> {}\n\n",
            hit.book_id, hit.para_id, hit.snippet
        ));
    }

    output
}

/// Print search results to console
pub fn print_search_results(result: &SearchResult) {
    println!("\n🔍 {}", format_search_results(result));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::{BookRecord, ParagraphRecord};
    use tempfile::TempDir;

    async fn setup() -> (Config, ContentStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        config.search.max_limit = 3;
        config.search.default_limit = 2;
        let store = ContentStore::connect(&config).await.unwrap();

        store
            .insert_book(&BookRecord {
                book_id: 1,
                code: "MH".into(),
                lang: "en".into(),
                book_type: "book".into(),
                title: "The Ministry of Healing".into(),
                author: Some("Ellen G. White".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let paragraphs: Vec<_> = (1..=5)
            .map(|i| ParagraphRecord {
                para_id: format!("1.{}", i),
                refcode_short: Some(format!("MH {}.1", i)),
                content: format!("<p>Health and healing, part {}.</p>", i),
                puborder: i,
                ..Default::default()
            })
            .collect();
        store.insert_chapter(1, Some("Our Example"), &paragraphs).await.unwrap();

        (config, store, tmp)
    }

    #[tokio::test]
    async fn test_limits_are_applied() {
        let (config, store, _tmp) = setup().await;

        let default = cmd_search(&config, &store, "healing", SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(default.hits.len(), 2);
        assert_eq!(default.total, 5);

        let clamped = cmd_search(
            &config,
            &store,
            "healing",
            SearchOptions {
                limit: Some(50),
                offset: Some(1),
            },
        )
        .await
        .unwrap();
        assert_eq!(clamped.limit, 3);
        assert_eq!(clamped.hits.len(), 3);

        let text = format_search_results(&clamped);
        assert!(text.contains("Found 5 matches"));
        assert!(text.contains("showing 2-4"));
        assert!(text.contains("The Ministry of Healing (MH"));
    }

    #[tokio::test]
    async fn test_query_error_propagates() {
        let (config, store, _tmp) = setup().await;
        let err = cmd_search(&config, &store, "\"open", SearchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Query(_)));
    }

    #[tokio::test]
    async fn test_no_results_message() {
        let (config, store, _tmp) = setup().await;
        let result = cmd_search(&config, &store, "zebra", SearchOptions::default())
            .await
            .unwrap();
        assert_eq!(result.total, 0);
        assert!(format_search_results(&result).starts_with("No results"));
    }

    #[tokio::test]
    async fn test_offset_past_end_reports_total() {
        let (config, store, _tmp) = setup().await;
        let result = cmd_search(
            &config,
            &store,
            "healing",
            SearchOptions {
                limit: None,
                offset: Some(10),
            },
        )
        .await
        .unwrap();
        assert!(result.hits.is_empty());
        assert_eq!(result.total, 5);

        let text = format_search_results(&result);
        assert!(text.starts_with("Found 5 matches"));
        assert!(text.contains("offset 10 is past the last result"));
    }
}
