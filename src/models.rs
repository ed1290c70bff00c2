// Core data structures for the siphon feed archiver

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Media classification for a feed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaType {
    #[default]
    Text,
    Audio,
    Video,
}

impl MediaType {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// True for audio or video items
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Audio | Self::Video)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One parsed RSS/Atom document
///
/// Constructed fresh on every successful parse and immutable afterward.
/// Only its items survive persistence, as converted articles.
#[derive(Debug, Clone)]
pub struct Feed {
    pub title: String,
    pub description: Option<String>,
    /// Canonical site link declared by the feed
    pub site_url: Option<String>,
    /// Feed URL; a self-link may override the URL that was requested
    pub feed_url: String,
    /// Publisher-declared author, if any
    pub author: Option<String>,
    pub last_build: Option<DateTime<Utc>>,
    /// Items in source document order
    pub items: Vec<FeedItem>,
}

/// One entry within a feed, pre-conversion
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: String,
    /// Canonical item URL; the stable external identity even when a GUID exists
    pub url: String,
    /// Defaults to fetch time when the feed omits or mangles the date
    pub published_at: DateTime<Utc>,
    /// Fallback chain: item author -> feed-declared creator -> feed title
    pub author: String,
    /// Raw HTML body
    pub content_html: String,
    /// Set only when a separate summary differs from the full body
    pub summary: Option<String>,
    pub media_type: MediaType,
    /// Lead image, never the media file itself
    pub image_url: Option<String>,
    /// Provider GUID; informational, not the dedup key
    pub guid: Option<String>,
    pub categories: Vec<String>,
}

/// Publication identity handed to the converter
#[derive(Debug, Clone)]
pub struct PublicationInfo {
    pub name: String,
    pub slug: String,
    /// Publication-level tags copied into each article's frontmatter
    pub tags: BTreeMap<String, String>,
}

/// Metadata extracted during conversion
#[derive(Debug, Clone)]
pub struct ArticleMetadata {
    pub title: String,
    pub author: String,
    pub publication: String,
    pub publication_slug: String,
    pub published_at: DateTime<Utc>,
    pub source_url: String,
    pub word_count: usize,
    /// ceil(word_count / 200) minutes
    pub estimated_read_time: usize,
    pub tags: BTreeMap<String, String>,
}

/// Output of the converter: metadata, Markdown body, and outbound links
#[derive(Debug, Clone)]
pub struct ConvertedArticle {
    pub metadata: ArticleMetadata,
    pub markdown: String,
    pub links: Vec<ExtractedLink>,
}

/// How an outbound link relates to the article hosting it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Same host as the source article
    Internal,
    /// Same hosting platform, different publication
    CrossPublication,
    External,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::CrossPublication => "cross-publication",
            Self::External => "external",
        }
    }
}

/// One outbound link extracted from an article body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub url: String,
    pub text: String,
    pub kind: LinkKind,
    /// `{subdomain}/{post-slug}`, derived only for platform-internal cross-links
    pub target_slug: Option<String>,
}

/// Publication-level configuration, supplied by the sources file
#[derive(Debug, Clone, Deserialize)]
pub struct IngestionSource {
    pub name: String,
    pub slug: String,
    pub feed_url: String,
    /// Overrides every item author when set
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl IngestionSource {
    /// Publication identity for the converter
    pub fn publication(&self) -> PublicationInfo {
        PublicationInfo {
            name: self.name.clone(),
            slug: self.slug.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Run-wide ingestion policy, immutable for one invocation
#[derive(Debug, Clone)]
pub struct IngestionOptions {
    /// Root of the Markdown library
    pub library_root: PathBuf,
    /// Minimum interval between network fetches, across all feeds
    pub delay: Duration,
    /// Per-attempt HTTP deadline
    pub timeout: Duration,
    /// Fetch attempts per feed before giving up
    pub max_attempts: u32,
    /// Convert but never write
    pub dry_run: bool,
    pub verbose: bool,
    /// Skip items published before this cutoff
    pub since: Option<DateTime<Utc>>,
    /// Inspect at most this many items per publication
    pub max_articles: Option<usize>,
    /// Optional SQLite mirror of stored articles
    pub index_db: Option<PathBuf>,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            library_root: PathBuf::from("./library"),
            delay: Duration::from_millis(1000),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            dry_run: false,
            verbose: false,
            since: None,
            max_articles: None,
            index_db: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_str() {
        assert_eq!(MediaType::Text.as_str(), "text");
        assert_eq!(MediaType::Audio.as_str(), "audio");
        assert_eq!(MediaType::Video.as_str(), "video");
        assert!(!MediaType::Text.is_media());
        assert!(MediaType::Audio.is_media());
        assert!(MediaType::Video.is_media());
    }

    #[test]
    fn test_link_kind_str() {
        assert_eq!(LinkKind::Internal.as_str(), "internal");
        assert_eq!(LinkKind::CrossPublication.as_str(), "cross-publication");
        assert_eq!(LinkKind::External.as_str(), "external");
    }

    #[test]
    fn test_source_deserialization() {
        let toml = r#"
name = "Example Letter"
slug = "example"
feed_url = "https://example.substack.com/feed"
author = "Jane Doe"

[tags]
topic = "tech"
"#;
        let source: IngestionSource = toml::from_str(toml).unwrap();
        assert_eq!(source.slug, "example");
        assert_eq!(source.author.as_deref(), Some("Jane Doe"));
        assert_eq!(source.tags.get("topic").map(String::as_str), Some("tech"));

        let publication = source.publication();
        assert_eq!(publication.name, "Example Letter");
        assert_eq!(publication.slug, "example");
    }

    #[test]
    fn test_source_optional_fields_default() {
        let toml = r#"
name = "Plain"
slug = "plain"
feed_url = "https://plain.example.com/rss"
"#;
        let source: IngestionSource = toml::from_str(toml).unwrap();
        assert!(source.author.is_none());
        assert!(source.tags.is_empty());
    }

    #[test]
    fn test_default_options() {
        let options = IngestionOptions::default();
        assert_eq!(options.delay, Duration::from_millis(1000));
        assert_eq!(options.max_attempts, 3);
        assert!(!options.dry_run);
        assert!(options.since.is_none());
        assert!(options.max_articles.is_none());
        assert!(options.index_db.is_none());
    }
}
