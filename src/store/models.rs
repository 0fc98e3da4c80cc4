//! Record types stored in and returned by the content store

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

/// Script direction of a language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Ltr => write!(f, "ltr"),
            Direction::Rtl => write!(f, "rtl"),
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ltr" => Ok(Direction::Ltr),
            "rtl" => Ok(Direction::Rtl),
            _ => Err(Error::InvalidInput(format!("Unknown direction: {}", s))),
        }
    }
}

/// A language of the corpus
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
    pub direction: String,
}

impl Language {
    pub fn new(code: impl Into<String>, name: impl Into<String>, direction: Direction) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            direction: direction.to_string(),
        }
    }

    pub fn get_direction(&self) -> Result<Direction> {
        self.direction.parse()
    }
}

/// Cover image URLs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCover {
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}

/// Downloadable file URLs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFiles {
    #[serde(default)]
    pub mp3: Option<String>,
    #[serde(default)]
    pub pdf: Option<String>,
    #[serde(default)]
    pub epub: Option<String>,
    #[serde(default)]
    pub mobi: Option<String>,
}

/// Book metadata as supplied by the content feed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookRecord {
    pub book_id: i64,
    pub code: String,
    pub lang: String,
    #[serde(rename = "type")]
    pub book_type: String,
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub npages: Option<i64>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub pub_year: Option<String>,
    #[serde(default)]
    pub folder_id: Option<i64>,
    #[serde(default)]
    pub cover: BookCover,
    #[serde(default)]
    pub files: BookFiles,
    #[serde(default)]
    pub cite: Option<String>,
    #[serde(default)]
    pub translated_into: Vec<String>,
    #[serde(default)]
    pub sort_order: i64,
}

/// A stored book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub book_id: i64,
    pub code: String,
    pub lang: String,
    #[serde(rename = "type")]
    pub book_type: String,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub npages: Option<i64>,
    pub publisher: Option<String>,
    pub pub_year: Option<String>,
    pub folder_id: Option<i64>,
    pub cover: BookCover,
    pub files: BookFiles,
    pub cite: Option<String>,
    pub translated_into: Vec<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub sort_order: i64,
    pub downloaded_at: Option<String>,
}

impl Book {
    /// Whether full paragraph content has been stored
    pub fn is_downloaded(&self) -> bool {
        self.downloaded_at.is_some()
    }
}

/// Flat row layout of the books table
#[derive(Debug, FromRow)]
pub(crate) struct BookRow {
    pub book_id: i64,
    pub code: String,
    pub lang: String,
    pub book_type: String,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub npages: Option<i64>,
    pub publisher: Option<String>,
    pub pub_year: Option<String>,
    pub folder_id: Option<i64>,
    pub cover_small: Option<String>,
    pub cover_large: Option<String>,
    pub file_mp3: Option<String>,
    pub file_pdf: Option<String>,
    pub file_epub: Option<String>,
    pub file_mobi: Option<String>,
    pub cite: Option<String>,
    pub translated_into: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub sort_order: i64,
    pub downloaded_at: Option<String>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Self {
            book_id: row.book_id,
            code: row.code,
            lang: row.lang,
            book_type: row.book_type,
            title: row.title,
            author: row.author,
            description: row.description,
            npages: row.npages,
            publisher: row.publisher,
            pub_year: row.pub_year,
            folder_id: row.folder_id,
            cover: BookCover {
                small: row.cover_small,
                large: row.cover_large,
            },
            files: BookFiles {
                mp3: row.file_mp3,
                pdf: row.file_pdf,
                epub: row.file_epub,
                mobi: row.file_mobi,
            },
            cite: row.cite,
            translated_into: serde_json::from_str(&row.translated_into).unwrap_or_default(),
            category: row.category,
            subcategory: row.subcategory,
            sort_order: row.sort_order,
            downloaded_at: row.downloaded_at,
        }
    }
}

/// Paragraph as supplied by the content feed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParagraphRecord {
    pub para_id: String,
    #[serde(default)]
    pub id_prev: Option<String>,
    #[serde(default)]
    pub id_next: Option<String>,
    #[serde(default)]
    pub refcode_short: Option<String>,
    #[serde(default)]
    pub refcode_long: Option<String>,
    #[serde(default)]
    pub element_type: Option<String>,
    pub content: String,
    pub puborder: i64,
}

/// A stored paragraph
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Paragraph {
    pub para_id: String,
    pub book_id: i64,
    pub id_prev: Option<String>,
    pub id_next: Option<String>,
    pub refcode_short: Option<String>,
    pub refcode_long: Option<String>,
    pub element_type: Option<String>,
    pub content: String,
    pub content_plain: String,
    pub puborder: i64,
    pub chapter_title: Option<String>,
}

/// One ranked full-text hit
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SearchHit {
    pub para_id: String,
    pub book_id: i64,
    pub refcode_short: Option<String>,
    pub refcode_long: Option<String>,
    pub puborder: i64,
    pub chapter_title: Option<String>,
    pub snippet: String,
    pub rank: f64,
    pub book_title: String,
    pub book_author: Option<String>,
    pub book_pub_year: Option<String>,
}

/// Filters for book listings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookFilter {
    pub lang: Option<String>,
    pub folder_id: Option<i64>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Book count per category pair
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub subcategory: String,
    pub count: i64,
}

/// Global store statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub language_count: usize,
    pub book_count: usize,
    pub downloaded_book_count: usize,
    pub paragraph_count: usize,
}

/// One chapter worth of paragraphs in an import bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterImport {
    pub book_id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub paragraphs: Vec<ParagraphRecord>,
}

/// Bulk hand-off format from the downloader
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportBundle {
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub books: Vec<BookRecord>,
    #[serde(default)]
    pub chapters: Vec<ChapterImport>,
}

/// Counts from an import run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportStats {
    pub languages: usize,
    pub books: usize,
    pub paragraphs: usize,
    pub books_completed: usize,
}
