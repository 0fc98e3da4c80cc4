//! Browsing commands: languages, categories, books and book text

use crate::error::{Error, Result};
use crate::store::{Book, BookFilter, CategoryCount, ContentStore, Language, Paragraph};
use serde::Serialize;
use tracing::info;

/// Largest page of paragraphs returned by a single read
pub const MAX_READ_LIMIT: u32 = 200;

/// Filtered book listing
#[derive(Debug, Clone, Serialize)]
pub struct BookListing {
    pub total: i64,
    pub books: Vec<Book>,
}

/// Book metadata with content counts
#[derive(Debug, Clone, Serialize)]
pub struct BookDetail {
    pub book: Book,
    pub paragraph_count: i64,
}

/// One page of a book's text
#[derive(Debug, Clone, Serialize)]
pub struct BookText {
    pub book: Book,
    pub total_paragraphs: i64,
    pub offset: u32,
    pub paragraphs: Vec<Paragraph>,
}

pub async fn cmd_list_languages(store: &ContentStore) -> Result<Vec<Language>> {
    store.get_languages().await
}

pub async fn cmd_list_categories(store: &ContentStore) -> Result<Vec<CategoryCount>> {
    store.get_categories().await
}

/// List books matching a filter
pub async fn cmd_list_books(store: &ContentStore, filter: &BookFilter) -> Result<BookListing> {
    info!("Listing books");

    if let Some(lang) = &filter.lang {
        if store.get_language(lang).await?.is_none() && store.count_books(filter).await? == 0 {
            return Err(Error::LanguageNotFound(lang.clone()));
        }
    }

    let books = store.get_books(filter).await?;
    let total = store.count_books(filter).await?;
    Ok(BookListing { total, books })
}

/// Book metadata, failing with `BookNotFound`
pub async fn cmd_get_book(store: &ContentStore, book_id: i64) -> Result<BookDetail> {
    let book = store.require_book(book_id).await?;
    let paragraph_count = store.count_paragraphs(book_id).await?;
    Ok(BookDetail {
        book,
        paragraph_count,
    })
}

/// A page of paragraphs in reading order
pub async fn cmd_read_book(
    store: &ContentStore,
    book_id: i64,
    offset: u32,
    limit: u32,
) -> Result<BookText> {
    let book = store.require_book(book_id).await?;
    let total_paragraphs = store.count_paragraphs(book_id).await?;
    if total_paragraphs == 0 {
        return Err(Error::EmptyContent(book_id));
    }

    let limit = limit.clamp(1, MAX_READ_LIMIT);
    let paragraphs = store
        .get_paragraphs(book_id, Some(limit), Some(offset))
        .await?;

    Ok(BookText {
        book,
        total_paragraphs,
        offset,
        paragraphs,
    })
}

pub fn format_languages(languages: &[Language]) -> String {
    if languages.is_empty() {
        return "No languages stored. Import a bundle first.".to_string();
    }
    let mut output = format!("Languages ({}):\n\n", languages.len());
    for lang in languages {
        output.push_str(&format!("- **{}** {} ({})\n", lang.code, lang.name, lang.direction));
    }
    output
}

pub fn format_categories(categories: &[CategoryCount]) -> String {
    if categories.is_empty() {
        return "No categorized books.".to_string();
    }
    let mut output = String::from("Categories:\n\n");
    let mut current = "";
    for c in categories {
        if c.category != current {
            output.push_str(&format!("**{}**\n", c.category));
            current = &c.category;
        }
        output.push_str(&format!("- {}: {} books\n", c.subcategory, c.count));
    }
    output
}

pub fn format_book_listing(listing: &BookListing) -> String {
    if listing.books.is_empty() {
        return "No books match the filter.".to_string();
    }
    let mut output = format!(
        "Books ({} of {}):\n\n",
        listing.books.len(),
        listing.total
    );
    for book in &listing.books {
        let author = book.author.as_deref().unwrap_or("Unknown author");
        let category = match (&book.category, &book.subcategory) {
            (Some(c), Some(s)) => format!("{}/{}", c, s),
            _ => "uncategorized".to_string(),
        };
        let downloaded = if book.is_downloaded() { "" } else { " (metadata only)" };
        output.push_str(&format!(
            "- **{}** [{}] {} by {}, {}{}\n",
            book.book_id, book.code, book.title, author, category, downloaded
        ));
    }
    output
}

pub fn format_book_detail(detail: &BookDetail) -> String {
    let book = &detail.book;
    let mut output = format!("# {}\n\n", book.title);
    output.push_str(&format!("- Book ID: {}\n", book.book_id));
    output.push_str(&format!("- Code: {}\n", book.code));
    output.push_str(&format!("- Language: {}\n", book.lang));
    output.push_str(&format!("- Type: {}\n", book.book_type));
    if let Some(author) = &book.author {
        output.push_str(&format!("- Author: {}\n", author));
    }
    if let Some(publisher) = &book.publisher {
        output.push_str(&format!("- Publisher: {}\n", publisher));
    }
    if let Some(year) = &book.pub_year {
        output.push_str(&format!("- Published: {}\n", year));
    }
    if let Some(pages) = book.npages {
        output.push_str(&format!("- Pages: {}\n", pages));
    }
    if let (Some(c), Some(s)) = (&book.category, &book.subcategory) {
        output.push_str(&format!("- Category: {}/{}\n", c, s));
    }
    if !book.translated_into.is_empty() {
        output.push_str(&format!(
            "- Translated into: {}\n",
            book.translated_into.join(", ")
        ));
    }
    output.push_str(&format!("- Paragraphs stored: {}\n", detail.paragraph_count));
    if let Some(description) = &book.description {
        output.push_str(&format!("\n{}\n", description));
    }
    output
}

pub fn format_book_text(text: &BookText) -> String {
    let mut output = format!(
        "# {} (paragraphs {}-{} of {})\n\n",
        text.book.title,
        text.offset as usize + 1,
        text.offset as usize + text.paragraphs.len(),
        text.total_paragraphs
    );
    let mut chapter: Option<&str> = None;
    for p in &text.paragraphs {
        if p.chapter_title.as_deref() != chapter {
            chapter = p.chapter_title.as_deref();
            if let Some(title) = chapter {
                output.push_str(&format!("## {}\n\n", title));
            }
        }
        match &p.refcode_short {
            Some(r) => output.push_str(&format!("{} {{{}}}\n\n", p.content_plain, r)),
            None => output.push_str(&format!("{}\n\n", p.content_plain)),
        }
    }
    output
}
