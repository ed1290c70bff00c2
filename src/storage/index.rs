//! Optional SQLite mirror of stored articles
//!
//! The Markdown files are the source of truth; this index exists for
//! callers that also want to query results relationally (the downstream
//! search/API layer reads it). One row per stored article, upserted on the
//! same (publication_slug, article_slug) key the filesystem uses, so the
//! index never disagrees with the library about identity.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use crate::convert::frontmatter::slugify;
use crate::models::ConvertedArticle;

/// SQLite-backed article index
pub struct ArticleIndex {
    conn: Mutex<Connection>,
}

/// One indexed article row
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedArticle {
    pub publication_slug: String,
    pub article_slug: String,
    pub title: String,
    pub author: String,
    pub published_at: String,
    pub source_url: String,
    pub word_count: usize,
    pub stored_path: String,
}

impl ArticleIndex {
    /// Open (and initialize) an index database at `path`
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory index, used by tests
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS articles (
                publication_slug TEXT NOT NULL,
                article_slug     TEXT NOT NULL,
                title            TEXT NOT NULL,
                author           TEXT NOT NULL,
                published_at     TEXT NOT NULL,
                source_url       TEXT NOT NULL,
                word_count       INTEGER NOT NULL,
                stored_path      TEXT NOT NULL,
                indexed_at       TEXT NOT NULL,
                PRIMARY KEY (publication_slug, article_slug)
            );
            CREATE INDEX IF NOT EXISTS idx_articles_published
                ON articles (published_at);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record one stored article, replacing any previous row for the same
    /// (publication, article-slug) pair
    pub fn record(&self, article: &ConvertedArticle, stored_path: &Path) -> rusqlite::Result<()> {
        let meta = &article.metadata;
        let conn = self.conn.lock().expect("index connection poisoned");
        conn.execute(
            "INSERT INTO articles (
                publication_slug, article_slug, title, author, published_at,
                source_url, word_count, stored_path, indexed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT (publication_slug, article_slug) DO UPDATE SET
                title = excluded.title,
                author = excluded.author,
                published_at = excluded.published_at,
                source_url = excluded.source_url,
                word_count = excluded.word_count,
                stored_path = excluded.stored_path,
                indexed_at = excluded.indexed_at",
            params![
                meta.publication_slug,
                slugify(&meta.title),
                meta.title,
                meta.author,
                meta.published_at.to_rfc3339(),
                meta.source_url,
                meta.word_count as i64,
                stored_path.display().to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Look up one indexed article
    pub fn get(
        &self,
        publication_slug: &str,
        article_slug: &str,
    ) -> rusqlite::Result<Option<IndexedArticle>> {
        let conn = self.conn.lock().expect("index connection poisoned");
        conn.query_row(
            "SELECT publication_slug, article_slug, title, author, published_at,
                    source_url, word_count, stored_path
             FROM articles
             WHERE publication_slug = ?1 AND article_slug = ?2",
            params![publication_slug, article_slug],
            |row| {
                Ok(IndexedArticle {
                    publication_slug: row.get(0)?,
                    article_slug: row.get(1)?,
                    title: row.get(2)?,
                    author: row.get(3)?,
                    published_at: row.get(4)?,
                    source_url: row.get(5)?,
                    word_count: row.get::<_, i64>(6)? as usize,
                    stored_path: row.get(7)?,
                })
            },
        )
        .optional()
    }

    /// Total indexed articles
    pub fn count(&self) -> rusqlite::Result<usize> {
        let conn = self.conn.lock().expect("index connection poisoned");
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
