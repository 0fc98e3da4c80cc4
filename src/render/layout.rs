//! Page geometry and the layout pass
//!
//! Layout turns chapters into positioned text runs. Nothing here touches the
//! PDF object model; `pdf.rs` serialises the result.

use super::chapters::Chapter;
use super::metrics::FontFamily;
use super::PdfOptions;
use crate::progress::{ProgressSink, RenderProgress};
use crate::store::Book;
use serde::{Deserialize, Serialize};

/// Maximum number of table of contents entries
pub const TOC_MAX_ENTRIES: usize = 50;

const NOTICE: &str = "This document was generated for personal study and educational use. \
The text is reproduced from publicly available sources and remains subject to the \
copyright of its original publishers. It may not be sold or redistributed for profit.";

// Offsets below the top margin on the title page
const TITLE_OFFSET: f32 = 100.0;
const AUTHOR_OFFSET: f32 = 200.0;
const PUBLICATION_OFFSET: f32 = 240.0;
const NOTICE_OFFSET: f32 = 320.0;

/// Named page sizes, in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    A4,
    Letter,
    Legal,
    Custom { width: f32, height: f32 },
}

impl PageSize {
    /// `(width, height)` in points
    pub fn dimensions(&self) -> (f32, f32) {
        match *self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom { width, height } => (width, height),
        }
    }
}

/// Page margins in points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Margins {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            bottom: value,
            left: value,
            right: value,
        }
    }
}

/// Text placed at a baseline position
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub runs: Vec<TextRun>,
}

impl PageLayout {
    fn push(&mut self, x: f32, y: f32, size: f32, text: impl Into<String>) {
        self.runs.push(TextRun {
            x,
            y,
            size,
            text: text.into(),
        });
    }
}

/// Result of the layout pass
#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutDocument {
    pub width: f32,
    pub height: f32,
    pub pages: Vec<PageLayout>,
    /// 1-based page number on which each chapter starts
    pub chapter_pages: Vec<usize>,
}

/// Greedy word wrap.
///
/// Words are appended while the line still fits `max_width`. A word wider
/// than `max_width` gets a line of its own and is never split.
pub fn wrap_text(text: &str, font: FontFamily, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{} {}", current, word);
        if font.text_width(&candidate, size) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Shorten `text` with a trailing ellipsis until it fits
fn truncate_to_width(text: &str, font: FontFamily, size: f32, max_width: f32) -> String {
    if font.text_width(text, size) <= max_width {
        return text.to_string();
    }
    let mut chars: Vec<char> = text.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect::<String>() + "...";
        if font.text_width(&candidate, size) <= max_width {
            return candidate;
        }
    }
    String::new()
}

/// Flowing writer for body pages
struct PageFlow {
    top: f32,
    bottom: f32,
    cursor: f32,
    pages: Vec<PageLayout>,
}

impl PageFlow {
    fn new(top: f32, bottom: f32) -> Self {
        Self {
            top,
            bottom,
            cursor: top,
            pages: Vec::new(),
        }
    }

    fn new_page(&mut self) {
        self.pages.push(PageLayout::default());
        self.cursor = self.top;
    }

    fn line(&mut self, x: f32, text: String, size: f32, height: f32) {
        if self.pages.is_empty() || self.cursor - self.bottom < height {
            self.new_page();
        }
        let baseline = self.cursor - size;
        if let Some(page) = self.pages.last_mut() {
            page.push(x, baseline, size, text);
        }
        self.cursor -= height;
    }

    fn gap(&mut self, height: f32) {
        self.cursor -= height;
    }
}

/// Lay out a whole book: title page, optional contents page, chapters.
///
/// Reports one rendering checkpoint per chapter.
pub fn layout_document(
    book: &Book,
    chapters: &[Chapter],
    options: &PdfOptions,
    sink: &mut dyn ProgressSink,
) -> LaidOutDocument {
    let (width, height) = options.page_size.dimensions();
    let margins = options.margins;
    let font = options.font_family;
    let content_width = width - margins.left - margins.right;
    let top = height - margins.top;
    let line_height = options.font_size * options.line_height;
    let title_line_height = options.title_font_size * options.line_height;

    let mut flow = PageFlow::new(top, margins.bottom);
    let mut starts = Vec::with_capacity(chapters.len());

    for (index, chapter) in chapters.iter().enumerate() {
        sink.report(RenderProgress::rendering(index, chapters.len()));

        flow.new_page();
        starts.push(flow.pages.len());

        for line in wrap_text(&chapter.title, font, options.title_font_size, content_width) {
            flow.line(
                margins.left,
                line,
                options.title_font_size,
                title_line_height,
            );
        }
        flow.gap(line_height);

        for paragraph in &chapter.paragraphs {
            for line in wrap_text(paragraph, font, options.font_size, content_width) {
                flow.line(margins.left, line, options.font_size, line_height);
            }
            flow.gap(line_height / 2.0);
        }
    }

    let front_pages = if options.include_toc { 2 } else { 1 };
    let chapter_pages: Vec<usize> = starts.iter().map(|s| s + front_pages).collect();

    let mut pages = Vec::with_capacity(front_pages + flow.pages.len());
    pages.push(title_page(book, options, top, content_width));
    if options.include_toc {
        pages.push(contents_page(chapters, &chapter_pages, options, top, content_width));
    }
    pages.extend(flow.pages);

    add_footers(&mut pages, options, content_width);

    LaidOutDocument {
        width,
        height,
        pages,
        chapter_pages,
    }
}

fn centered_x(text: &str, font: FontFamily, size: f32, left: f32, content_width: f32) -> f32 {
    left + ((content_width - font.text_width(text, size)) / 2.0).max(0.0)
}

fn title_page(book: &Book, options: &PdfOptions, top: f32, content_width: f32) -> PageLayout {
    let font = options.font_family;
    let left = options.margins.left;
    let title_size = options.title_font_size * 1.5;
    let mut page = PageLayout::default();

    let mut y = top - TITLE_OFFSET;
    for line in wrap_text(&book.title, font, title_size, content_width) {
        let x = centered_x(&line, font, title_size, left, content_width);
        page.push(x, y, title_size, line);
        y -= title_size * 1.2;
    }

    if let Some(author) = book.author.as_deref().filter(|a| !a.trim().is_empty()) {
        let size = options.title_font_size;
        let x = centered_x(author, font, size, left, content_width);
        page.push(x, top - AUTHOR_OFFSET, size, author);
    }

    let publication: Vec<&str> = [
        book.publisher.as_deref(),
        book.pub_year.as_deref(),
        Some(book.code.as_str()),
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.trim().is_empty())
    .collect();
    if !publication.is_empty() {
        let line = publication.join(" | ");
        let x = centered_x(&line, font, options.font_size, left, content_width);
        page.push(x, top - PUBLICATION_OFFSET, options.font_size, line);
    }

    let notice_size = options.font_size * 0.9;
    let mut y = top - NOTICE_OFFSET;
    for line in wrap_text(NOTICE, font, notice_size, content_width) {
        page.push(left, y, notice_size, line);
        y -= notice_size * options.line_height;
    }

    page
}

fn contents_page(
    chapters: &[Chapter],
    chapter_pages: &[usize],
    options: &PdfOptions,
    top: f32,
    content_width: f32,
) -> PageLayout {
    let font = options.font_family;
    let left = options.margins.left;
    let right = left + content_width;
    let size = options.font_size;
    let line_height = size * options.line_height;
    let mut page = PageLayout::default();

    let mut y = top - options.title_font_size;
    page.push(left, y, options.title_font_size, "Contents");
    y -= options.title_font_size * options.line_height + line_height;

    for (chapter, page_number) in chapters.iter().zip(chapter_pages).take(TOC_MAX_ENTRIES) {
        if y < options.margins.bottom {
            break;
        }

        let number = page_number.to_string();
        let number_width = font.text_width(&number, size);
        let label = truncate_to_width(
            &format!("{}. {}", chapter.number, chapter.title),
            font,
            size,
            content_width - number_width - size,
        );

        page.push(left, y, size, label);
        page.push(right - number_width, y, size, number);
        y -= line_height;
    }

    page
}

fn add_footers(pages: &mut [PageLayout], options: &PdfOptions, content_width: f32) {
    let font = options.font_family;
    let size = options.font_size * 0.8;
    let y = options.margins.bottom / 2.0;

    for (index, page) in pages.iter_mut().enumerate().skip(1) {
        let number = (index + 1).to_string();
        let x = centered_x(&number, font, size, options.margins.left, content_width);
        page.push(x, y, size, number);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::store::{BookCover, BookFiles};

    fn book() -> Book {
        Book {
            book_id: 1,
            code: "SC".into(),
            lang: "en".into(),
            book_type: "book".into(),
            title: "Steps to Christ".into(),
            author: Some("Ellen G. White".into()),
            description: None,
            npages: Some(125),
            publisher: Some("Pacific Press".into()),
            pub_year: Some("1892".into()),
            folder_id: None,
            cover: BookCover::default(),
            files: BookFiles::default(),
            cite: None,
            translated_into: Vec::new(),
            category: Some("egw".into()),
            subcategory: Some("books".into()),
            sort_order: 0,
            downloaded_at: None,
        }
    }

    fn chapter(number: usize, title: &str, paragraphs: usize, words: usize) -> Chapter {
        let text = vec!["faith"; words].join(" ");
        Chapter {
            number,
            title: title.to_string(),
            paragraphs: vec![text; paragraphs],
        }
    }

    fn texts(page: &PageLayout) -> Vec<&str> {
        page.runs.iter().map(|r| r.text.as_str()).collect()
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "And he spake a parable unto them to this end, that men ought always \
                    to pray, and not to faint; saying, There was in a city a judge, which \
                    feared not God, neither regarded man: and there was a widow in that city";
        for font in [FontFamily::Helvetica, FontFamily::Times, FontFamily::Courier] {
            for max_width in [60.0, 120.0, 250.0, 451.28] {
                let lines = wrap_text(text, font, 11.0, max_width);
                for line in &lines {
                    let single_word = !line.contains(' ');
                    assert!(
                        single_word || font.text_width(line, 11.0) <= max_width,
                        "{:?} overflows {}",
                        line,
                        max_width
                    );
                }
                let rejoined = lines.join(" ");
                assert_eq!(rejoined, text.split_whitespace().collect::<Vec<_>>().join(" "));
            }
        }
    }

    #[test]
    fn test_wrap_places_long_word_alone() {
        let lines = wrap_text(
            "a incomprehensibilities b",
            FontFamily::Times,
            12.0,
            40.0,
        );
        assert_eq!(lines, vec!["a", "incomprehensibilities", "b"]);
        assert!(wrap_text("   ", FontFamily::Times, 12.0, 40.0).is_empty());
    }

    #[test]
    fn test_page_sizes() {
        assert_eq!(PageSize::Letter.dimensions(), (612.0, 792.0));
        assert_eq!(PageSize::Legal.dimensions(), (612.0, 1008.0));
        assert_eq!(
            PageSize::Custom {
                width: 300.0,
                height: 400.0
            }
            .dimensions(),
            (300.0, 400.0)
        );
    }

    #[test]
    fn test_front_matter_and_chapter_pages() {
        let options = PdfOptions::default();
        let chapters = vec![chapter(1, "Intro", 2, 20), chapter(2, "Ch1", 1, 20)];

        let doc = layout_document(&book(), &chapters, &options, &mut NoProgress);

        assert_eq!(doc.pages.len(), 4);
        assert_eq!(doc.chapter_pages, vec![3, 4]);

        let title = texts(&doc.pages[0]);
        assert!(title.contains(&"Steps to Christ"));
        assert!(title.contains(&"Ellen G. White"));
        assert!(title.contains(&"Pacific Press | 1892 | SC"));
        assert!(title.join(" ").contains("personal study and educational use"));

        let toc = texts(&doc.pages[1]);
        assert_eq!(toc[0], "Contents");
        assert!(toc.contains(&"1. Intro"));
        assert!(toc.contains(&"2. Ch1"));
        assert!(toc.contains(&"3"));

        assert_eq!(doc.pages[2].runs[0].text, "Intro");
        assert_eq!(doc.pages[2].runs[0].size, options.title_font_size);
        assert_eq!(doc.pages[3].runs[0].text, "Ch1");
    }

    #[test]
    fn test_without_toc() {
        let options = PdfOptions {
            include_toc: false,
            ..Default::default()
        };
        let chapters = vec![chapter(1, "Only", 1, 5)];
        let doc = layout_document(&book(), &chapters, &options, &mut NoProgress);
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.chapter_pages, vec![2]);
    }

    #[test]
    fn test_footers_skip_title_page() {
        let options = PdfOptions::default();
        let chapters = vec![chapter(1, "Intro", 1, 5)];
        let doc = layout_document(&book(), &chapters, &options, &mut NoProgress);

        let footer_y = options.margins.bottom / 2.0;
        assert!(!doc.pages[0].runs.iter().any(|r| r.y == footer_y));
        for (index, page) in doc.pages.iter().enumerate().skip(1) {
            let footer = page.runs.iter().find(|r| r.y == footer_y).unwrap();
            assert_eq!(footer.text, (index + 1).to_string());
        }
    }

    #[test]
    fn test_page_fill_breaks_long_chapter() {
        let options = PdfOptions::default();
        let chapters = vec![chapter(1, "Long", 40, 120)];
        let doc = layout_document(&book(), &chapters, &options, &mut NoProgress);

        assert!(doc.pages.len() > 4);
        let (_, height) = options.page_size.dimensions();
        for page in &doc.pages[2..] {
            for run in page.runs.iter().filter(|r| r.y > options.margins.bottom) {
                assert!(run.y <= height - options.margins.top);
            }
            let body_runs = page
                .runs
                .iter()
                .filter(|r| r.size == options.font_size)
                .count();
            assert!(body_runs > 0);
        }
    }

    #[test]
    fn test_toc_capped_at_fifty() {
        let options = PdfOptions {
            font_size: 6.0,
            ..Default::default()
        };
        let chapters: Vec<_> = (1..=60).map(|n| chapter(n, "Part", 1, 3)).collect();
        let doc = layout_document(&book(), &chapters, &options, &mut NoProgress);

        let entries = doc.pages[1]
            .runs
            .iter()
            .filter(|r| r.text.ends_with(". Part"))
            .count();
        assert_eq!(entries, TOC_MAX_ENTRIES);
    }

    #[test]
    fn test_toc_stops_when_page_is_full() {
        let options = PdfOptions::default();
        let chapters: Vec<_> = (1..=60).map(|n| chapter(n, "Part", 1, 3)).collect();
        let doc = layout_document(&book(), &chapters, &options, &mut NoProgress);

        let toc = &doc.pages[1];
        let entries = toc
            .runs
            .iter()
            .filter(|r| r.text.ends_with(". Part"))
            .count();
        assert!(entries > 0 && entries < TOC_MAX_ENTRIES);
        assert!(toc
            .runs
            .iter()
            .filter(|r| r.text.ends_with(". Part"))
            .all(|r| r.y >= options.margins.bottom));
    }

    #[test]
    fn test_long_toc_title_truncated() {
        let options = PdfOptions::default();
        let long = "A very long chapter title ".repeat(10);
        let chapters = vec![chapter(1, long.trim(), 1, 3)];
        let doc = layout_document(&book(), &chapters, &options, &mut NoProgress);

        let (width, _) = options.page_size.dimensions();
        let content_width = width - options.margins.left - options.margins.right;
        let label = doc.pages[1]
            .runs
            .iter()
            .find(|r| r.text.starts_with("1. "))
            .unwrap();
        assert!(label.text.ends_with("..."));
        assert!(options.font_family.text_width(&label.text, options.font_size) < content_width);
    }

    #[test]
    fn test_reports_each_chapter() {
        let options = PdfOptions::default();
        let chapters = vec![
            chapter(1, "A", 1, 3),
            chapter(2, "B", 1, 3),
            chapter(3, "C", 1, 3),
        ];
        let mut seen = Vec::new();
        let mut sink = |p: RenderProgress| seen.push(p.percent);
        layout_document(&book(), &chapters, &options, &mut sink);
        assert_eq!(seen, vec![50, 63, 76]);
    }
}
