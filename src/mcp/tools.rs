//! MCP tool definitions and handlers

use super::types::{ToolDefinition, ToolResult};
use crate::commands::{
    cmd_get_book, cmd_list_books, cmd_list_categories, cmd_list_languages, cmd_read_book,
    cmd_search, cmd_status, format_book_detail, format_book_listing, format_book_text,
    format_categories, format_languages, format_search_results, format_status, SearchOptions,
};
use crate::config::Config;
use crate::error::Error;
use crate::jobs::{Job, JobService, JobStatus};
use crate::render::{export_file_name, PdfOptions};
use crate::store::{BookFilter, ContentStore};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::error;

/// Paragraphs returned by `read_book` when no limit is given
const DEFAULT_READ_LIMIT: u32 = 50;

/// Everything a tool handler may touch
pub struct ToolContext<'a> {
    pub config: &'a Config,
    pub store: &'a ContentStore,
    pub jobs: &'a JobService,
}

/// Get all available tool definitions
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "search_writings".to_string(),
            description: "Full-text search across all stored paragraphs. Supports quoted phrases (\"the lord\") and prefix wildcards (heal*). Returns ranked matches with highlighted snippets.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search expression"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default: 20, max: 100)",
                        "minimum": 0
                    },
                    "offset": {
                        "type": "integer",
                        "description": "Number of results to skip",
                        "default": 0,
                        "minimum": 0
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "list_languages".to_string(),
            description: "List all languages available in the library.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolDefinition {
            name: "list_books".to_string(),
            description: "List books, optionally filtered by language, folder or category.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "lang": { "type": "string", "description": "Language code, e.g. en" },
                    "folder_id": { "type": "integer", "description": "Folder ID" },
                    "category": { "type": "string", "description": "Category, e.g. egw" },
                    "subcategory": { "type": "string", "description": "Subcategory, e.g. books" },
                    "limit": { "type": "integer", "description": "Maximum number of books", "minimum": 1 },
                    "offset": { "type": "integer", "description": "Number of books to skip", "minimum": 0 }
                }
            }),
        },
        ToolDefinition {
            name: "get_book".to_string(),
            description: "Show metadata for one book.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "book_id": { "type": "integer", "description": "Book ID" }
                },
                "required": ["book_id"]
            }),
        },
        ToolDefinition {
            name: "read_book".to_string(),
            description: "Read a book's paragraphs in publication order.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "book_id": { "type": "integer", "description": "Book ID" },
                    "offset": { "type": "integer", "description": "First paragraph (0-based)", "default": 0 },
                    "limit": { "type": "integer", "description": "Paragraphs to return (default: 50, max: 200)", "default": 50 }
                },
                "required": ["book_id"]
            }),
        },
        ToolDefinition {
            name: "list_categories".to_string(),
            description: "List book categories and subcategories with counts.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolDefinition {
            name: "library_status".to_string(),
            description: "Get library statistics and storage locations.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolDefinition {
            name: "generate_pdf".to_string(),
            description: "Start generating a PDF of a book in the background. Returns a job token; poll pdf_status for progress.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "book_id": { "type": "integer", "description": "Book ID" },
                    "options": {
                        "type": "object",
                        "description": "Layout overrides",
                        "properties": {
                            "page_size": {
                                "description": "a4, letter, legal, or {\"custom\": {\"width\": w, \"height\": h}} in points"
                            },
                            "margins": {
                                "type": "object",
                                "properties": {
                                    "top": { "type": "number" },
                                    "bottom": { "type": "number" },
                                    "left": { "type": "number" },
                                    "right": { "type": "number" }
                                }
                            },
                            "font_family": { "type": "string", "enum": ["helvetica", "times", "courier"] },
                            "font_size": { "type": "number" },
                            "title_font_size": { "type": "number" },
                            "line_height": { "type": "number" },
                            "include_toc": { "type": "boolean" }
                        }
                    }
                },
                "required": ["book_id"]
            }),
        },
        ToolDefinition {
            name: "pdf_status".to_string(),
            description: "Get the status of a PDF generation job.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "token": { "type": "string", "description": "Job token from generate_pdf" }
                },
                "required": ["token"]
            }),
        },
        ToolDefinition {
            name: "pdf_download".to_string(),
            description: "Save the PDF of a completed job to disk. The job is consumed: a second download of the same token fails.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "token": { "type": "string", "description": "Job token from generate_pdf" },
                    "output": { "type": "string", "description": "Destination file (defaults to the export directory)" }
                },
                "required": ["token"]
            }),
        },
    ]
}

/// Handle a tool call
pub async fn handle_tool_call(
    name: &str,
    arguments: &HashMap<String, Value>,
    ctx: &ToolContext<'_>,
) -> ToolResult {
    match name {
        "search_writings" => handle_search(arguments, ctx).await,
        "list_languages" => handle_languages(ctx).await,
        "list_books" => handle_list_books(arguments, ctx).await,
        "get_book" => handle_get_book(arguments, ctx).await,
        "read_book" => handle_read_book(arguments, ctx).await,
        "list_categories" => handle_categories(ctx).await,
        "library_status" => handle_status(ctx).await,
        "generate_pdf" => handle_generate_pdf(arguments, ctx).await,
        "pdf_status" => handle_pdf_status(arguments, ctx).await,
        "pdf_download" => handle_pdf_download(arguments, ctx).await,
        _ => ToolResult::error(format!("Unknown tool: {}", name)),
    }
}

fn arg_str<'a>(arguments: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
    arguments.get(key).and_then(|v| v.as_str())
}

fn arg_u32(arguments: &HashMap<String, Value>, key: &str) -> Option<u32> {
    arguments
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v.min(u32::MAX as u64) as u32)
}

fn require_book_id(arguments: &HashMap<String, Value>) -> Result<i64, ToolResult> {
    arguments
        .get("book_id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| ToolResult::error("Missing required parameter: book_id"))
}

fn failure(context: &str, err: &Error) -> ToolResult {
    ToolResult::error(format!("{} ({}): {}", context, err.kind(), err))
}

async fn handle_search(arguments: &HashMap<String, Value>, ctx: &ToolContext<'_>) -> ToolResult {
    let query = match arg_str(arguments, "query") {
        Some(q) if !q.trim().is_empty() => q,
        _ => return ToolResult::error("Missing required parameter: query"),
    };

    let options = SearchOptions {
        limit: arg_u32(arguments, "limit"),
        offset: arg_u32(arguments, "offset"),
    };

    match cmd_search(ctx.config, ctx.store, query, options).await {
        Ok(result) => ToolResult::text(format_search_results(&result)),
        Err(e) => failure("Search failed", &e),
    }
}

async fn handle_languages(ctx: &ToolContext<'_>) -> ToolResult {
    match cmd_list_languages(ctx.store).await {
        Ok(languages) => ToolResult::text(format_languages(&languages)),
        Err(e) => failure("Failed to list languages", &e),
    }
}

async fn handle_list_books(
    arguments: &HashMap<String, Value>,
    ctx: &ToolContext<'_>,
) -> ToolResult {
    let filter = BookFilter {
        lang: arg_str(arguments, "lang").map(ToString::to_string),
        folder_id: arguments.get("folder_id").and_then(|v| v.as_i64()),
        category: arg_str(arguments, "category").map(ToString::to_string),
        subcategory: arg_str(arguments, "subcategory").map(ToString::to_string),
        limit: arg_u32(arguments, "limit"),
        offset: arg_u32(arguments, "offset"),
    };

    match cmd_list_books(ctx.store, &filter).await {
        Ok(listing) => ToolResult::text(format_book_listing(&listing)),
        Err(e) => failure("Failed to list books", &e),
    }
}

async fn handle_get_book(arguments: &HashMap<String, Value>, ctx: &ToolContext<'_>) -> ToolResult {
    let book_id = match require_book_id(arguments) {
        Ok(id) => id,
        Err(result) => return result,
    };

    match cmd_get_book(ctx.store, book_id).await {
        Ok(detail) => ToolResult::text(format_book_detail(&detail)),
        Err(e) => failure("Failed to get book", &e),
    }
}

async fn handle_read_book(arguments: &HashMap<String, Value>, ctx: &ToolContext<'_>) -> ToolResult {
    let book_id = match require_book_id(arguments) {
        Ok(id) => id,
        Err(result) => return result,
    };
    let offset = arg_u32(arguments, "offset").unwrap_or(0);
    let limit = arg_u32(arguments, "limit").unwrap_or(DEFAULT_READ_LIMIT);

    match cmd_read_book(ctx.store, book_id, offset, limit).await {
        Ok(text) => ToolResult::text(format_book_text(&text)),
        Err(e) => failure("Failed to read book", &e),
    }
}

async fn handle_categories(ctx: &ToolContext<'_>) -> ToolResult {
    match cmd_list_categories(ctx.store).await {
        Ok(categories) => ToolResult::text(format_categories(&categories)),
        Err(e) => failure("Failed to list categories", &e),
    }
}

async fn handle_status(ctx: &ToolContext<'_>) -> ToolResult {
    let status = match cmd_status(ctx.config, ctx.store).await {
        Ok(s) => s,
        Err(e) => return failure("Failed to get status", &e),
    };

    let mut output = format_status(&status);
    match ctx.jobs.list().await {
        Ok(jobs) if !jobs.is_empty() => {
            output.push_str(&format!("\n**PDF jobs:** {}\n", jobs.len()));
            for job in &jobs {
                output.push_str(&format!(
                    "- {} book {}: {} ({}%)\n",
                    job.token, job.book_id, job.status, job.progress
                ));
            }
        }
        Ok(_) => {}
        Err(e) => error!(error = %e, "Failed to list jobs"),
    }

    ToolResult::text(output)
}

/// Overlay caller-supplied layout fields on the configured defaults
fn merge_pdf_options(base: &PdfOptions, overrides: Option<&Value>) -> Result<PdfOptions, Error> {
    let overrides = match overrides {
        None | Some(Value::Null) => return Ok(base.clone()),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(Error::InvalidInput(
                "options must be an object".to_string(),
            ))
        }
    };

    let mut merged = serde_json::to_value(base)?;
    if let Value::Object(target) = &mut merged {
        for (key, value) in overrides {
            target.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(merged)
        .map_err(|e| Error::InvalidInput(format!("Invalid options: {}", e)))
}

async fn handle_generate_pdf(
    arguments: &HashMap<String, Value>,
    ctx: &ToolContext<'_>,
) -> ToolResult {
    let book_id = match require_book_id(arguments) {
        Ok(id) => id,
        Err(result) => return result,
    };

    let options = match merge_pdf_options(&ctx.config.pdf.layout, arguments.get("options")) {
        Ok(o) => o,
        Err(e) => return failure("Invalid PDF options", &e),
    };

    match ctx.jobs.submit(book_id, options).await {
        Ok(ticket) => ToolResult::text(format!(
            "PDF generation {} for book {}.\n\nToken: {}\n\nUse pdf_status with this token to follow progress.",
            ticket.status, book_id, ticket.token
        )),
        Err(e) => failure("Failed to start PDF generation", &e),
    }
}

fn format_job(job: &Job) -> String {
    let mut output = format!(
        "PDF job {}\n\n- Book ID: {}\n- Status: {}\n- Progress: {}%\n",
        job.token, job.book_id, job.status, job.progress
    );
    if let Some(stage) = job.stage {
        output.push_str(&format!("- Stage: {}\n", stage));
    }
    if let (Some(current), Some(total)) = (job.current_chapter, job.total_chapters) {
        output.push_str(&format!("- Chapter: {} of {}\n", current, total));
    }
    if job.status == JobStatus::Completed {
        if let Some(path) = &job.file_path {
            output.push_str(&format!("- File: {}\n", path.display()));
        }
    }
    if let Some(err) = &job.error {
        output.push_str(&format!("- Error ({}): {}\n", err.kind, err.message));
    }
    output.push_str(&format!("- Created: {}\n", job.created_at.to_rfc3339()));
    output
}

async fn handle_pdf_status(
    arguments: &HashMap<String, Value>,
    ctx: &ToolContext<'_>,
) -> ToolResult {
    let token = match arg_str(arguments, "token") {
        Some(t) => t,
        None => return ToolResult::error("Missing required parameter: token"),
    };

    match ctx.jobs.status(token).await {
        Ok(job) => ToolResult::text(format_job(&job)),
        Err(e) => failure("Failed to get job status", &e),
    }
}

async fn handle_pdf_download(
    arguments: &HashMap<String, Value>,
    ctx: &ToolContext<'_>,
) -> ToolResult {
    let token = match arg_str(arguments, "token") {
        Some(t) => t,
        None => return ToolResult::error("Missing required parameter: token"),
    };

    let download = match ctx.jobs.download(token).await {
        Ok(d) => d,
        Err(e) => return failure("Failed to download PDF", &e),
    };

    let path = match arg_str(arguments, "output") {
        Some(output) => PathBuf::from(output),
        None => {
            let file_name = match ctx.store.get_book(download.book_id).await {
                Ok(Some(book)) => export_file_name(&book),
                _ => format!("book-{}.pdf", download.book_id),
            };
            ctx.config.paths.export_dir.join(file_name)
        }
    };

    if let Err(e) = save_pdf(&path, &download.bytes).await {
        return failure("Failed to save PDF", &e);
    }

    ToolResult::text(format!(
        "Saved {} bytes for book {} to {}",
        download.bytes.len(),
        download.book_id,
        path.display()
    ))
}

async fn save_pdf(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobStore, MemoryJobStore};
    use crate::render::PageSize;
    use crate::store::{BookRecord, ParagraphRecord};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        config: Config,
        store: ContentStore,
        jobs: JobService,
        job_store: Arc<MemoryJobStore>,
        _tmp: TempDir,
    }

    impl Fixture {
        fn ctx(&self) -> ToolContext<'_> {
            ToolContext {
                config: &self.config,
                store: &self.store,
                jobs: &self.jobs,
            }
        }
    }

    async fn setup() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        let store = ContentStore::connect(&config).await.unwrap();
        let job_store = Arc::new(MemoryJobStore::new());
        let jobs = JobService::new(
            store.clone(),
            job_store.clone(),
            config.paths.export_dir.clone(),
        );

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
        store
            .insert_paragraph(
                &ParagraphRecord {
                    para_id: "1.1".into(),
                    content: "<p>Nature and revelation alike testify of God's love.</p>".into(),
                    puborder: 1,
                    ..Default::default()
                },
                1,
                Some("God's Love for Man"),
            )
            .await
            .unwrap();

        Fixture {
            config,
            store,
            jobs,
            job_store,
            _tmp: tmp,
        }
    }

    fn args(value: Value) -> HashMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_tool_names() {
        let names: Vec<_> = get_tool_definitions().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "search_writings",
                "list_languages",
                "list_books",
                "get_book",
                "read_book",
                "list_categories",
                "library_status",
                "generate_pdf",
                "pdf_status",
                "pdf_download",
            ]
        );
    }

    #[tokio::test]
    async fn test_search_tool() {
        let fx = setup().await;
        let result = handle_tool_call(
            "search_writings",
            &args(json!({"query": "revelation"})),
            &fx.ctx(),
        )
        .await;
        assert!(result.is_error.is_none());
        assert!(result.first_text().contains("<mark>revelation</mark>"));

        let bad = handle_tool_call(
            "search_writings",
            &args(json!({"query": "\"open"})),
            &fx.ctx(),
        )
        .await;
        assert_eq!(bad.is_error, Some(true));
        assert!(bad.first_text().contains("query_error"));

        let missing = handle_tool_call("search_writings", &args(json!({})), &fx.ctx()).await;
        assert_eq!(missing.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_book_tools() {
        let fx = setup().await;

        let book = handle_tool_call("get_book", &args(json!({"book_id": 1})), &fx.ctx()).await;
        assert!(book.first_text().contains("# Steps to Christ"));

        let missing = handle_tool_call("get_book", &args(json!({"book_id": 2})), &fx.ctx()).await;
        assert_eq!(missing.is_error, Some(true));
        assert!(missing.first_text().contains("not_found"));

        let text = handle_tool_call("read_book", &args(json!({"book_id": 1})), &fx.ctx()).await;
        assert!(text.first_text().contains("## God's Love for Man"));

        let books = handle_tool_call(
            "list_books",
            &args(json!({"category": "egw"})),
            &fx.ctx(),
        )
        .await;
        assert!(books.first_text().contains("Steps to Christ"));

        let status = handle_tool_call("library_status", &args(json!({})), &fx.ctx()).await;
        assert!(status.first_text().contains("- Paragraphs: 1"));

        let unknown = handle_tool_call("nope", &args(json!({})), &fx.ctx()).await;
        assert_eq!(unknown.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_generate_and_poll_pdf() {
        let fx = setup().await;

        let started = handle_tool_call(
            "generate_pdf",
            &args(json!({"book_id": 1, "options": {"page_size": "letter"}})),
            &fx.ctx(),
        )
        .await;
        assert!(started.is_error.is_none(), "{}", started.first_text());
        let token = started
            .first_text()
            .lines()
            .find_map(|l| l.strip_prefix("Token: "))
            .unwrap()
            .to_string();

        let job = fx.jobs.status(&token).await.unwrap();
        assert_eq!(job.options.page_size, PageSize::Letter);
        assert_eq!(job.options.font_size, fx.config.pdf.layout.font_size);

        let status = handle_tool_call(
            "pdf_status",
            &args(json!({"token": token})),
            &fx.ctx(),
        )
        .await;
        assert!(status.first_text().contains("- Book ID: 1"));

        let unknown = handle_tool_call(
            "pdf_status",
            &args(json!({"token": "missing"})),
            &fx.ctx(),
        )
        .await;
        assert_eq!(unknown.is_error, Some(true));
    }

    #[test]
    fn test_merge_pdf_options() {
        let base = PdfOptions::default();
        assert_eq!(merge_pdf_options(&base, None).unwrap(), base);

        let merged = merge_pdf_options(&base, Some(&json!({"include_toc": false}))).unwrap();
        assert!(!merged.include_toc);
        assert_eq!(merged.page_size, base.page_size);

        assert!(merge_pdf_options(&base, Some(&json!("a4"))).is_err());
        assert!(merge_pdf_options(&base, Some(&json!({"font_family": "comic"}))).is_err());
    }

    #[tokio::test]
    async fn test_download_saves_and_consumes_job() {
        let fx = setup().await;
        let ticket = fx.jobs.submit(1, PdfOptions::default()).await.unwrap();

        for _ in 0..200 {
            if fx.jobs.status(&ticket.token).await.unwrap().status.is_terminal() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(
            fx.jobs.status(&ticket.token).await.unwrap().status,
            JobStatus::Completed
        );

        let result = handle_tool_call(
            "pdf_download",
            &args(json!({"token": ticket.token})),
            &fx.ctx(),
        )
        .await;
        assert!(result.is_error.is_none(), "{}", result.first_text());

        let saved = fx.config.paths.export_dir.join("SC-1.pdf");
        assert!(result.first_text().contains(&saved.display().to_string()));
        assert!(std::fs::read(&saved).unwrap().starts_with(b"%PDF"));

        let again = handle_tool_call(
            "pdf_download",
            &args(json!({"token": ticket.token})),
            &fx.ctx(),
        )
        .await;
        assert_eq!(again.is_error, Some(true));
        assert!(again.first_text().contains("not_found"));
    }

    #[tokio::test]
    async fn test_download_before_completion_is_rejected() {
        let fx = setup().await;
        let mut job = Job::new("pending", 1, PdfOptions::default());
        job.status = JobStatus::Generating;
        job.progress = 62;
        fx.job_store.put(job).await.unwrap();

        let result =
            handle_tool_call("pdf_download", &args(json!({"token": "pending"})), &fx.ctx()).await;
        assert_eq!(result.is_error, Some(true));
        assert!(result.first_text().contains("invalid_request"));
        assert!(result.first_text().contains("62%"));
    }
}
