//! SQLite schema definition

/// SQL schema for the content store
pub const SCHEMA_SQL: &str = r#"
-- Languages: bulk upserted from the content feed, never deleted
CREATE TABLE IF NOT EXISTS languages (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    direction TEXT NOT NULL DEFAULT 'ltr' CHECK (direction IN ('ltr', 'rtl'))
);

-- Books: metadata plus derived category; downloaded_at marks full content
CREATE TABLE IF NOT EXISTS books (
    book_id INTEGER PRIMARY KEY,
    code TEXT NOT NULL,
    lang TEXT NOT NULL,
    book_type TEXT NOT NULL,
    title TEXT NOT NULL,
    author TEXT,
    description TEXT,
    npages INTEGER,
    publisher TEXT,
    pub_year TEXT,
    folder_id INTEGER,
    cover_small TEXT,
    cover_large TEXT,
    file_mp3 TEXT,
    file_pdf TEXT,
    file_epub TEXT,
    file_mobi TEXT,
    cite TEXT,
    translated_into TEXT NOT NULL DEFAULT '[]',
    category TEXT,
    subcategory TEXT,
    sort_order INTEGER NOT NULL DEFAULT 0,
    downloaded_at TEXT,
    CHECK ((category IS NULL) = (subcategory IS NULL))
);

-- Paragraphs: reading order is puborder within a book
CREATE TABLE IF NOT EXISTS paragraphs (
    id INTEGER PRIMARY KEY,
    para_id TEXT NOT NULL UNIQUE,
    book_id INTEGER NOT NULL REFERENCES books(book_id),
    id_prev TEXT,
    id_next TEXT,
    refcode_short TEXT,
    refcode_long TEXT,
    element_type TEXT,
    content TEXT NOT NULL,
    content_plain TEXT NOT NULL,
    puborder INTEGER NOT NULL,
    chapter_title TEXT,
    UNIQUE(book_id, puborder)
);

-- Full-text index: one row per paragraph, rowid = paragraphs.id
CREATE VIRTUAL TABLE IF NOT EXISTS paragraphs_fts USING fts5(
    content_plain,
    book_id UNINDEXED,
    title UNINDEXED,
    author UNINDEXED
);

CREATE TRIGGER IF NOT EXISTS paragraphs_ai AFTER INSERT ON paragraphs BEGIN
    INSERT INTO paragraphs_fts(rowid, content_plain, book_id, title, author)
    SELECT NEW.id, NEW.content_plain, NEW.book_id, b.title, b.author
    FROM books b WHERE b.book_id = NEW.book_id;
END;

CREATE TRIGGER IF NOT EXISTS paragraphs_ad AFTER DELETE ON paragraphs BEGIN
    DELETE FROM paragraphs_fts WHERE rowid = OLD.id;
END;

CREATE TRIGGER IF NOT EXISTS paragraphs_au AFTER UPDATE ON paragraphs BEGIN
    DELETE FROM paragraphs_fts WHERE rowid = OLD.id;
    INSERT INTO paragraphs_fts(rowid, content_plain, book_id, title, author)
    SELECT NEW.id, NEW.content_plain, NEW.book_id, b.title, b.author
    FROM books b WHERE b.book_id = NEW.book_id;
END;

CREATE TRIGGER IF NOT EXISTS books_au_fts AFTER UPDATE OF title, author ON books BEGIN
    UPDATE paragraphs_fts SET title = NEW.title, author = NEW.author
    WHERE rowid IN (SELECT id FROM paragraphs WHERE book_id = NEW.book_id);
END;

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_books_lang ON books(lang);
CREATE INDEX IF NOT EXISTS idx_books_folder ON books(folder_id);
CREATE INDEX IF NOT EXISTS idx_books_category ON books(category, subcategory);
CREATE INDEX IF NOT EXISTS idx_books_order ON books(sort_order, title);
CREATE INDEX IF NOT EXISTS idx_paragraphs_book ON paragraphs(book_id, puborder);
"#;
