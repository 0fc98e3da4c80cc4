//! Document renderer: paragraph stream to paginated PDF
//!
//! Rendering is split into a pure layout pass and a serialisation pass.
//! [`render_book`] is synchronous; [`export_book`] adds the fetch from the
//! content store in front of it.

pub mod chapters;
pub mod layout;
pub mod metrics;
pub mod pdf;

pub use chapters::{group_chapters, Chapter};
pub use layout::{
    layout_document, wrap_text, LaidOutDocument, Margins, PageLayout, PageSize, TextRun,
};
pub use metrics::FontFamily;

use crate::config::{
    default_font_family, default_font_size, default_include_toc, default_line_height,
    default_margins, default_page_size, default_title_font_size,
};
use crate::error::{Error, Result};
use crate::progress::{ProgressSink, ProgressStage, RenderProgress};
use crate::store::{Book, ContentStore, Paragraph};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Layout configuration for one export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfOptions {
    #[serde(default = "default_page_size")]
    pub page_size: PageSize,

    #[serde(default = "default_margins")]
    pub margins: Margins,

    #[serde(default = "default_font_family")]
    pub font_family: FontFamily,

    /// Body text size in points
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    /// Chapter title size in points
    #[serde(default = "default_title_font_size")]
    pub title_font_size: f32,

    /// Line height as a multiple of the font size
    #[serde(default = "default_line_height")]
    pub line_height: f32,

    #[serde(default = "default_include_toc")]
    pub include_toc: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            margins: default_margins(),
            font_family: default_font_family(),
            font_size: default_font_size(),
            title_font_size: default_title_font_size(),
            line_height: default_line_height(),
            include_toc: default_include_toc(),
        }
    }
}

impl PdfOptions {
    /// Check that the options describe a usable page
    pub fn validate(&self) -> std::result::Result<(), String> {
        let (width, height) = self.page_size.dimensions();
        if !(width > 0.0 && height > 0.0) {
            return Err(format!("page size must be positive, got {}x{}", width, height));
        }
        if !(self.font_size > 0.0) {
            return Err("font_size must be positive".to_string());
        }
        if !(self.title_font_size > 0.0) {
            return Err("title_font_size must be positive".to_string());
        }
        if !(self.line_height > 0.0) {
            return Err("line_height must be positive".to_string());
        }

        let m = &self.margins;
        if [m.top, m.bottom, m.left, m.right].iter().any(|v| *v < 0.0) {
            return Err("margins must not be negative".to_string());
        }
        if width - m.left - m.right <= 0.0 {
            return Err("left and right margins leave no content width".to_string());
        }
        let tallest_line = self.font_size.max(self.title_font_size) * self.line_height;
        if height - m.top - m.bottom < tallest_line {
            return Err("top and bottom margins leave no room for a line".to_string());
        }
        Ok(())
    }
}

/// Render a book whose paragraphs are already loaded.
///
/// `paragraphs` must be sorted by `puborder`.
pub fn render_book(
    book: &Book,
    paragraphs: &[Paragraph],
    options: &PdfOptions,
    sink: &mut dyn ProgressSink,
) -> Result<Vec<u8>> {
    if paragraphs.is_empty() {
        return Err(Error::EmptyContent(book.book_id));
    }
    options.validate().map_err(Error::InvalidInput)?;

    sink.report(RenderProgress::at(ProgressStage::Processing, 20));
    let chapters = group_chapters(paragraphs);
    debug!(book_id = book.book_id, chapters = chapters.len(), "Grouped chapters");

    sink.report(RenderProgress::at(ProgressStage::Formatting, 40));
    let layout = layout_document(book, &chapters, options, sink);

    let bytes = pdf::write_pdf(&layout, book, options.font_family)?;

    sink.report(RenderProgress {
        stage: ProgressStage::Complete,
        percent: 100,
        current_chapter: Some(chapters.len()),
        total_chapters: Some(chapters.len()),
    });

    info!(
        book_id = book.book_id,
        pages = layout.pages.len(),
        bytes = bytes.len(),
        "Rendered book"
    );
    Ok(bytes)
}

/// Load a book's content for rendering.
///
/// Fails with `BookNotFound` or `EmptyContent` before anything is drawn.
pub async fn fetch_book(store: &ContentStore, book_id: i64) -> Result<(Book, Vec<Paragraph>)> {
    let book = store.require_book(book_id).await?;
    let paragraphs = store.get_paragraphs(book_id, None, None).await?;
    if paragraphs.is_empty() {
        return Err(Error::EmptyContent(book_id));
    }
    Ok((book, paragraphs))
}

/// Fetch and render a book in one call
pub async fn export_book(
    store: &ContentStore,
    book_id: i64,
    options: &PdfOptions,
    sink: &mut dyn ProgressSink,
) -> Result<(Book, Vec<u8>)> {
    sink.report(RenderProgress::at(ProgressStage::Fetching, 0));
    let (book, paragraphs) = fetch_book(store, book_id).await?;
    let bytes = render_book(&book, &paragraphs, options, sink)?;
    Ok((book, bytes))
}

/// File name for an exported book
pub fn export_file_name(book: &Book) -> String {
    let code: String = book
        .code
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if code.is_empty() {
        format!("book-{}.pdf", book.book_id)
    } else {
        format!("{}-{}.pdf", code, book.book_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{BookRecord, ParagraphRecord};
    use tempfile::TempDir;

    async fn setup_store() -> (ContentStore, TempDir) {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::open(&tmp.path().join("library.db"))
            .await
            .unwrap();
        (store, tmp)
    }

    fn record(book_id: i64) -> BookRecord {
        BookRecord {
            book_id,
            code: "SC".into(),
            lang: "en".into(),
            book_type: "book".into(),
            title: "Steps to Christ".into(),
            author: Some("Ellen G. White".into()),
            npages: Some(125),
            ..Default::default()
        }
    }

    fn para(id: &str, puborder: i64, content: &str) -> ParagraphRecord {
        ParagraphRecord {
            para_id: id.into(),
            content: content.into(),
            puborder,
            ..Default::default()
        }
    }

    #[test]
    fn test_options_validation() {
        assert!(PdfOptions::default().validate().is_ok());

        let tiny = PdfOptions {
            page_size: PageSize::Custom {
                width: 100.0,
                height: 100.0,
            },
            ..Default::default()
        };
        assert!(tiny.validate().is_err());

        let negative = PdfOptions {
            margins: Margins::uniform(-1.0),
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let zero_line = PdfOptions {
            line_height: 0.0,
            ..Default::default()
        };
        assert!(zero_line.validate().is_err());
    }

    #[test]
    fn test_options_from_partial_json() {
        let options: PdfOptions = serde_json::from_value(serde_json::json!({
            "page_size": "letter",
            "include_toc": false
        }))
        .unwrap();
        assert_eq!(options.page_size, PageSize::Letter);
        assert!(!options.include_toc);
        assert_eq!(options.font_size, 11.0);

        let custom: PdfOptions = serde_json::from_value(serde_json::json!({
            "page_size": { "custom": { "width": 400.0, "height": 600.0 } }
        }))
        .unwrap();
        assert_eq!(custom.page_size.dimensions(), (400.0, 600.0));
    }

    #[tokio::test]
    async fn test_export_reports_monotonic_progress() {
        let (store, _tmp) = setup_store().await;
        store.insert_book(&record(1)).await.unwrap();
        store
            .insert_chapter(
                1,
                Some("Intro"),
                &[para("1.1", 1, "<p>One</p>"), para("1.2", 2, "<p>Two</p>")],
            )
            .await
            .unwrap();
        store
            .insert_chapter(1, Some("Ch1"), &[para("1.3", 3, "<p>Three</p>")])
            .await
            .unwrap();

        let mut events = Vec::new();
        let mut sink = |p: RenderProgress| events.push(p);
        let (book, bytes) = export_book(&store, 1, &PdfOptions::default(), &mut sink)
            .await
            .unwrap();

        assert_eq!(book.book_id, 1);
        assert!(bytes.starts_with(b"%PDF"));

        let stages: Vec<_> = events.iter().map(|e| e.stage).collect();
        assert_eq!(
            stages,
            vec![
                ProgressStage::Fetching,
                ProgressStage::Processing,
                ProgressStage::Formatting,
                ProgressStage::Rendering,
                ProgressStage::Rendering,
                ProgressStage::Complete,
            ]
        );
        let percents: Vec<_> = events.iter().map(|e| e.percent).collect();
        assert_eq!(percents, vec![0, 20, 40, 50, 70, 100]);
        assert_eq!(events[4].current_chapter, Some(2));
        assert_eq!(events[4].total_chapters, Some(2));
    }

    #[tokio::test]
    async fn test_export_missing_book() {
        let (store, _tmp) = setup_store().await;
        let mut sink = crate::progress::NoProgress;
        let err = export_book(&store, 77, &PdfOptions::default(), &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BookNotFound(77)));
    }

    #[tokio::test]
    async fn test_export_empty_book() {
        let (store, _tmp) = setup_store().await;
        store.insert_book(&record(2)).await.unwrap();

        let mut events = Vec::new();
        let mut sink = |p: RenderProgress| events.push(p.stage);
        let err = export_book(&store, 2, &PdfOptions::default(), &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyContent(2)));
        assert_eq!(events, vec![ProgressStage::Fetching]);
    }

    #[test]
    fn test_export_file_name() {
        let book = crate::store::Book {
            book_id: 5,
            code: "S C/1".into(),
            lang: "en".into(),
            book_type: "book".into(),
            title: "T".into(),
            author: None,
            description: None,
            npages: None,
            publisher: None,
            pub_year: None,
            folder_id: None,
            cover: Default::default(),
            files: Default::default(),
            cite: None,
            translated_into: Vec::new(),
            category: None,
            subcategory: None,
            sort_order: 0,
            downloaded_at: None,
        };
        assert_eq!(export_file_name(&book), "S_C_1-5.pdf");
    }
}
