//! Markdown library storage
//!
//! Articles live at `{root}/{publication_slug}/{article_slug}.md` where the
//! article slug is derived from the title. That pair is the dedup key: a
//! second store with the same title silently overwrites the earlier file,
//! and a retitled post writes a fresh file. The files themselves are the
//! durable state — a crash mid-run leaves everything already written, which
//! is exactly what the next run's existence checks resume from.

use std::fs;
use std::path::{Path, PathBuf};

use crate::convert::frontmatter::{generate_frontmatter, parse_frontmatter, slugify, Frontmatter};
use crate::models::ConvertedArticle;
use crate::utils::error::StorageError;

/// Filesystem-backed article library
#[derive(Debug, Clone)]
pub struct ArticleLibrary {
    root: PathBuf,
}

/// Aggregate library statistics for operational tooling
#[derive(Debug, Clone, Default)]
pub struct LibraryStats {
    pub publications: usize,
    pub articles: usize,
    /// Sum of word counts recovered from frontmatter
    pub total_words: usize,
}

impl ArticleLibrary {
    /// Create a library rooted at `root`. The directory is created lazily
    /// on first store.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical path for one article
    pub fn article_path(&self, publication_slug: &str, article_slug: &str) -> PathBuf {
        self.root
            .join(publication_slug)
            .join(format!("{article_slug}.md"))
    }

    /// Dedup check: has this (publication, title-slug) pair been stored?
    pub fn exists(&self, publication_slug: &str, article_slug: &str) -> bool {
        self.article_path(publication_slug, article_slug).exists()
    }

    /// Write one article as frontmatter + blank line + Markdown body.
    ///
    /// Creates missing parent directories. An existing file with the same
    /// slug is overwritten without comment.
    ///
    /// # Errors
    ///
    /// Returns a structured [`StorageError`] on any I/O failure so the
    /// caller can record it per-article and keep going.
    pub fn store(&self, article: &ConvertedArticle) -> Result<PathBuf, StorageError> {
        let article_slug = slugify(&article.metadata.title);
        if article_slug.is_empty() {
            return Err(StorageError::EmptySlug(article.metadata.title.clone()));
        }

        let path = self.article_path(&article.metadata.publication_slug, &article_slug);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let content = format!(
            "{}\n\n{}\n",
            generate_frontmatter(&article.metadata),
            article.markdown
        );
        fs::write(&path, content).map_err(|e| StorageError::io(&path, e))?;

        tracing::debug!(path = %path.display(), "Stored article");
        Ok(path)
    }

    /// Read one article's full content; `Ok(None)` when it was never stored
    pub fn read(
        &self,
        publication_slug: &str,
        article_slug: &str,
    ) -> Result<Option<String>, StorageError> {
        let path = self.article_path(publication_slug, article_slug);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    /// Recover a stored article's frontmatter, if the file exists and
    /// carries a block
    pub fn read_frontmatter(
        &self,
        publication_slug: &str,
        article_slug: &str,
    ) -> Result<Option<Frontmatter>, StorageError> {
        Ok(self
            .read(publication_slug, article_slug)?
            .as_deref()
            .and_then(parse_frontmatter))
    }

    /// Publication slugs present in the library, sorted
    pub fn publications(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.root, e)),
        };

        let mut slugs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.root, e))?;
            if entry.path().is_dir() {
                slugs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        slugs.sort();
        Ok(slugs)
    }

    /// Article slugs stored for one publication, sorted
    pub fn articles(&self, publication_slug: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.root.join(publication_slug);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&dir, e)),
        };

        let mut slugs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(slug) = name.strip_suffix(".md") {
                slugs.push(slug.to_string());
            }
        }
        slugs.sort();
        Ok(slugs)
    }

    /// Walk the whole library and aggregate counts
    pub fn stats(&self) -> Result<LibraryStats, StorageError> {
        let mut stats = LibraryStats::default();
        for publication in self.publications()? {
            let articles = self.articles(&publication)?;
            if articles.is_empty() {
                continue;
            }
            stats.publications += 1;
            stats.articles += articles.len();
            for article in &articles {
                if let Some(fm) = self.read_frontmatter(&publication, article)? {
                    stats.total_words += fm.word_count.unwrap_or(0);
                }
            }
        }
        Ok(stats)
    }
}
