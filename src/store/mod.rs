//! Content storage using SQLite
//!
//! This module handles all persistent library content:
//! - Languages (bulk upserted from the content feed)
//! - Books (metadata plus derived category)
//! - Paragraphs (HTML content with a plain-text shadow column)
//! - The FTS5 index over paragraph text, kept in sync by triggers

mod models;
mod schema;

pub use models::*;
pub use schema::*;

use crate::categorize::{categorize_book, BookTraits};
use crate::config::{Config, SearchConfig};
use crate::error::{Error, Result};
use crate::text::strip_html;
use chrono::Utc;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Content store handle
#[derive(Clone)]
pub struct ContentStore {
    pool: SqlitePool,
    search: SearchConfig,
}

impl ContentStore {
    /// Connect to the store described by the configuration
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::open_with(
            &config.paths.db_file,
            config.database.max_connections,
            config.search.clone(),
        )
        .await
    }

    /// Open a store at a path with default settings
    pub async fn open(db_path: &Path) -> Result<Self> {
        Self::open_with(db_path, 5, SearchConfig::default()).await
    }

    async fn open_with(db_path: &Path, max_connections: u32, search: SearchConfig) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool, search };

        if !store.is_initialized().await? {
            store.init_schema().await?;
        }

        Ok(store)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='paragraphs'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    // ===== Language Operations =====

    /// Insert or update a language
    pub async fn insert_language(&self, language: &Language) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        write_language(&mut conn, language).await
    }

    /// List all languages by name
    pub async fn get_languages(&self) -> Result<Vec<Language>> {
        let languages = sqlx::query_as::<_, Language>("SELECT * FROM languages ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(languages)
    }

    /// Get a language by code
    pub async fn get_language(&self, code: &str) -> Result<Option<Language>> {
        let language = sqlx::query_as::<_, Language>("SELECT * FROM languages WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(language)
    }

    // ===== Book Operations =====

    /// Insert or update a book, deriving its category
    ///
    /// Existing paragraphs and `downloaded_at` survive an update.
    pub async fn insert_book(&self, record: &BookRecord) -> Result<Book> {
        let mut conn = self.pool.acquire().await?;
        write_book(&mut conn, record).await?;
        drop(conn);
        self.require_book(record.book_id).await
    }

    /// Get book by ID
    pub async fn get_book(&self, book_id: i64) -> Result<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE book_id = ?")
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Book::from))
    }

    /// Get book by ID, failing with `BookNotFound`
    pub async fn require_book(&self, book_id: i64) -> Result<Book> {
        self.get_book(book_id)
            .await?
            .ok_or(Error::BookNotFound(book_id))
    }

    /// List books matching a filter, ordered by `(sort_order, title)`
    pub async fn get_books(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM books WHERE 1 = 1");
        push_book_filter(&mut qb, filter);
        qb.push(" ORDER BY sort_order, title");
        push_page(&mut qb, filter.limit, filter.offset);

        let rows: Vec<BookRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Book::from).collect())
    }

    /// Count books matching a filter, ignoring limit and offset
    pub async fn count_books(&self, filter: &BookFilter) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM books WHERE 1 = 1");
        push_book_filter(&mut qb, filter);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Book counts per category pair
    pub async fn get_categories(&self) -> Result<Vec<CategoryCount>> {
        let categories = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT category, subcategory, COUNT(*) AS count
            FROM books
            WHERE category IS NOT NULL
            GROUP BY category, subcategory
            ORDER BY category, subcategory
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    /// Record that a book's full content has been stored
    pub async fn mark_downloaded(&self, book_id: i64) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        set_downloaded(&mut conn, book_id).await
    }

    // ===== Paragraph Operations =====

    /// Insert or update a paragraph
    ///
    /// The plain-text column is derived from `content`; the FTS triggers
    /// index it.
    pub async fn insert_paragraph(
        &self,
        record: &ParagraphRecord,
        book_id: i64,
        chapter_title: Option<&str>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        ensure_book(&mut tx, book_id).await?;
        write_paragraph(&mut tx, record, book_id, chapter_title).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Insert every paragraph of one chapter in a single transaction
    pub async fn insert_chapter(
        &self,
        book_id: i64,
        chapter_title: Option<&str>,
        records: &[ParagraphRecord],
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        ensure_book(&mut tx, book_id).await?;
        for record in records {
            write_paragraph(&mut tx, record, book_id, chapter_title).await?;
        }
        tx.commit().await?;

        debug!(
            book_id,
            chapter = chapter_title.unwrap_or(""),
            count = records.len(),
            "Inserted chapter"
        );
        Ok(records.len())
    }

    /// Get paragraph by ID
    pub async fn get_paragraph(&self, para_id: &str) -> Result<Option<Paragraph>> {
        let paragraph = sqlx::query_as::<_, Paragraph>("SELECT * FROM paragraphs WHERE para_id = ?")
            .bind(para_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(paragraph)
    }

    /// Paragraphs of a book in reading order
    pub async fn get_paragraphs(
        &self,
        book_id: i64,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<Paragraph>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM paragraphs WHERE book_id = ");
        qb.push_bind(book_id);
        qb.push(" ORDER BY puborder");
        push_page(&mut qb, limit, offset);

        let paragraphs = qb
            .build_query_as::<Paragraph>()
            .fetch_all(&self.pool)
            .await?;
        Ok(paragraphs)
    }

    /// Number of paragraphs stored for a book
    pub async fn count_paragraphs(&self, book_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM paragraphs WHERE book_id = ?")
            .bind(book_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Delete a single paragraph; returns whether it existed
    ///
    /// A downloaded book losing its last paragraph goes back to metadata-only.
    pub async fn delete_paragraph(&self, para_id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let owner: Option<i64> =
            sqlx::query_scalar("DELETE FROM paragraphs WHERE para_id = ? RETURNING book_id")
                .bind(para_id)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some(book_id) = owner {
            release_if_empty(&mut tx, book_id).await?;
        }

        tx.commit().await?;
        Ok(owner.is_some())
    }

    /// Delete all paragraphs of a book and reset it to metadata-only
    pub async fn clear_paragraphs(&self, book_id: i64) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM paragraphs WHERE book_id = ?")
            .bind(book_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("UPDATE books SET downloaded_at = NULL WHERE book_id = ?")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted)
    }

    // ===== Search =====

    /// Ranked full-text search with highlighted snippets
    ///
    /// `query` is passed to FTS5 verbatim; syntax errors surface as
    /// `Error::Query`.
    pub async fn search(&self, query: &str, limit: u32, offset: u32) -> Result<Vec<SearchHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let hits = sqlx::query_as::<_, SearchHit>(
            r#"
            SELECT
                p.para_id,
                p.book_id,
                p.refcode_short,
                p.refcode_long,
                p.puborder,
                p.chapter_title,
                snippet(paragraphs_fts, 0, ?, ?, '...', ?) AS snippet,
                paragraphs_fts.rank AS rank,
                b.title AS book_title,
                b.author AS book_author,
                b.pub_year AS book_pub_year
            FROM paragraphs_fts
            JOIN paragraphs p ON p.id = paragraphs_fts.rowid
            JOIN books b ON b.book_id = p.book_id
            WHERE paragraphs_fts MATCH ?
            ORDER BY paragraphs_fts.rank, paragraphs_fts.rowid
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(&self.search.highlight_start)
        .bind(&self.search.highlight_end)
        .bind(self.search.snippet_tokens.clamp(1, 64) as i64)
        .bind(query)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        debug!(query, hits = hits.len(), "Search complete");
        Ok(hits)
    }

    /// Total number of paragraphs matching a query
    pub async fn search_count(&self, query: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM paragraphs_fts WHERE paragraphs_fts MATCH ?")
                .bind(query)
                .fetch_one(&self.pool)
                .await
                .map_err(query_error)?;
        Ok(count)
    }

    // ===== Bulk Import =====

    /// Load a bundle of languages, books and chapters
    ///
    /// The whole bundle is one transaction: any failure leaves the store
    /// untouched. Books that received paragraphs are marked downloaded.
    pub async fn import_bundle(&self, bundle: &ImportBundle) -> Result<ImportStats> {
        let mut stats = ImportStats::default();
        let mut tx = self.pool.begin().await?;

        for language in &bundle.languages {
            write_language(&mut tx, language).await?;
            stats.languages += 1;
        }

        for book in &bundle.books {
            write_book(&mut tx, book).await?;
            stats.books += 1;
        }

        let mut touched = BTreeSet::new();
        for chapter in &bundle.chapters {
            ensure_book(&mut tx, chapter.book_id).await?;
            for record in &chapter.paragraphs {
                write_paragraph(&mut tx, record, chapter.book_id, chapter.title.as_deref())
                    .await?;
            }
            stats.paragraphs += chapter.paragraphs.len();
            if !chapter.paragraphs.is_empty() {
                touched.insert(chapter.book_id);
            }
        }

        for book_id in touched {
            set_downloaded(&mut tx, book_id).await?;
            stats.books_completed += 1;
        }

        tx.commit().await?;

        info!(
            languages = stats.languages,
            books = stats.books,
            paragraphs = stats.paragraphs,
            "Import complete"
        );
        Ok(stats)
    }

    // ===== Statistics =====

    /// Get global statistics
    pub async fn get_stats(&self) -> Result<StoreStats> {
        let language_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM languages")
            .fetch_one(&self.pool)
            .await?;

        let book_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;

        let downloaded_book_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE downloaded_at IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;

        let paragraph_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM paragraphs")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            language_count: language_count as usize,
            book_count: book_count as usize,
            downloaded_book_count: downloaded_book_count as usize,
            paragraph_count: paragraph_count as usize,
        })
    }
}

async fn write_language(conn: &mut SqliteConnection, language: &Language) -> Result<()> {
    language.get_direction()?;
    sqlx::query(
        r#"
        INSERT INTO languages (code, name, direction)
        VALUES (?, ?, ?)
        ON CONFLICT(code) DO UPDATE SET
            name = excluded.name,
            direction = excluded.direction
        "#,
    )
    .bind(&language.code)
    .bind(&language.name)
    .bind(language.direction.to_lowercase())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn write_book(conn: &mut SqliteConnection, record: &BookRecord) -> Result<()> {
    let category = categorize_book(&BookTraits {
        author: record.author.as_deref().unwrap_or(""),
        title: &record.title,
        book_type: &record.book_type,
        code: &record.code,
        npages: record.npages,
    });

    let translated_into = serde_json::to_string(&record.translated_into)?;

    sqlx::query(
        r#"
        INSERT INTO books (
            book_id, code, lang, book_type, title, author, description, npages,
            publisher, pub_year, folder_id, cover_small, cover_large,
            file_mp3, file_pdf, file_epub, file_mobi, cite, translated_into,
            category, subcategory, sort_order
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(book_id) DO UPDATE SET
            code = excluded.code,
            lang = excluded.lang,
            book_type = excluded.book_type,
            title = excluded.title,
            author = excluded.author,
            description = excluded.description,
            npages = excluded.npages,
            publisher = excluded.publisher,
            pub_year = excluded.pub_year,
            folder_id = excluded.folder_id,
            cover_small = excluded.cover_small,
            cover_large = excluded.cover_large,
            file_mp3 = excluded.file_mp3,
            file_pdf = excluded.file_pdf,
            file_epub = excluded.file_epub,
            file_mobi = excluded.file_mobi,
            cite = excluded.cite,
            translated_into = excluded.translated_into,
            category = excluded.category,
            subcategory = excluded.subcategory,
            sort_order = excluded.sort_order
        "#,
    )
    .bind(record.book_id)
    .bind(&record.code)
    .bind(&record.lang)
    .bind(&record.book_type)
    .bind(&record.title)
    .bind(&record.author)
    .bind(&record.description)
    .bind(record.npages)
    .bind(&record.publisher)
    .bind(&record.pub_year)
    .bind(record.folder_id)
    .bind(&record.cover.small)
    .bind(&record.cover.large)
    .bind(&record.files.mp3)
    .bind(&record.files.pdf)
    .bind(&record.files.epub)
    .bind(&record.files.mobi)
    .bind(&record.cite)
    .bind(translated_into)
    .bind(&category.category)
    .bind(&category.subcategory)
    .bind(record.sort_order)
    .execute(&mut *conn)
    .await?;

    debug!(
        book_id = record.book_id,
        category = %category.category,
        subcategory = %category.subcategory,
        "Upserted book"
    );
    Ok(())
}

async fn ensure_book(conn: &mut SqliteConnection, book_id: i64) -> Result<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT book_id FROM books WHERE book_id = ?")
        .bind(book_id)
        .fetch_optional(&mut *conn)
        .await?;
    exists.map(|_| ()).ok_or(Error::BookNotFound(book_id))
}

async fn set_downloaded(conn: &mut SqliteConnection, book_id: i64) -> Result<()> {
    ensure_book(conn, book_id).await?;

    let paragraphs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM paragraphs WHERE book_id = ?")
        .bind(book_id)
        .fetch_one(&mut *conn)
        .await?;
    if paragraphs == 0 {
        return Err(Error::EmptyContent(book_id));
    }

    sqlx::query("UPDATE books SET downloaded_at = ? WHERE book_id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(book_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Downloaded books must keep at least one paragraph
async fn release_if_empty(conn: &mut SqliteConnection, book_id: i64) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE books SET downloaded_at = NULL
        WHERE book_id = ?
          AND downloaded_at IS NOT NULL
          AND NOT EXISTS (SELECT 1 FROM paragraphs WHERE book_id = ?)
        "#,
    )
    .bind(book_id)
    .bind(book_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        debug!(book_id, "Book has no paragraphs left, reset to metadata-only");
    }
    Ok(())
}

async fn write_paragraph(
    conn: &mut SqliteConnection,
    record: &ParagraphRecord,
    book_id: i64,
    chapter_title: Option<&str>,
) -> Result<()> {
    let previous_owner: Option<i64> =
        sqlx::query_scalar("SELECT book_id FROM paragraphs WHERE para_id = ?")
            .bind(&record.para_id)
            .fetch_optional(&mut *conn)
            .await?;

    let content_plain = strip_html(&record.content);

    sqlx::query(
        r#"
        INSERT INTO paragraphs (
            para_id, book_id, id_prev, id_next, refcode_short, refcode_long,
            element_type, content, content_plain, puborder, chapter_title
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(para_id) DO UPDATE SET
            book_id = excluded.book_id,
            id_prev = excluded.id_prev,
            id_next = excluded.id_next,
            refcode_short = excluded.refcode_short,
            refcode_long = excluded.refcode_long,
            element_type = excluded.element_type,
            content = excluded.content,
            content_plain = excluded.content_plain,
            puborder = excluded.puborder,
            chapter_title = excluded.chapter_title
        "#,
    )
    .bind(&record.para_id)
    .bind(book_id)
    .bind(&record.id_prev)
    .bind(&record.id_next)
    .bind(&record.refcode_short)
    .bind(&record.refcode_long)
    .bind(&record.element_type)
    .bind(&record.content)
    .bind(content_plain)
    .bind(record.puborder)
    .bind(chapter_title)
    .execute(&mut *conn)
    .await?;

    if let Some(old_book) = previous_owner.filter(|&old| old != book_id) {
        release_if_empty(conn, old_book).await?;
    }
    Ok(())
}

fn push_book_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &BookFilter) {
    if let Some(lang) = &filter.lang {
        qb.push(" AND lang = ").push_bind(lang.clone());
    }
    if let Some(folder_id) = filter.folder_id {
        qb.push(" AND folder_id = ").push_bind(folder_id);
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(subcategory) = &filter.subcategory {
        qb.push(" AND subcategory = ").push_bind(subcategory.clone());
    }
}

fn push_page(qb: &mut QueryBuilder<'_, Sqlite>, limit: Option<u32>, offset: Option<u32>) {
    // SQLite needs a LIMIT before OFFSET; -1 means unbounded
    let limit = limit.map(i64::from).unwrap_or(-1);
    qb.push(" LIMIT ").push_bind(limit);
    if let Some(offset) = offset {
        qb.push(" OFFSET ").push_bind(i64::from(offset));
    }
}

/// Errors raised while evaluating a MATCH expression belong to the caller's query
fn query_error(err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::Database(db_err) => Error::Query(db_err.message().to_string()),
        other => Error::Database(other),
    }
}
