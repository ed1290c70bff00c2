//! Ingestion pipeline orchestrator
//!
//! Drives the end-to-end flow: fetch a source's feed once, walk its items in
//! document order, and decide skip / convert / store for each. Every fallible
//! step resolves to a result value ([`ArticleOutcome`], [`SourceReport`],
//! [`BatchReport`]) so the batch loop stays straight-line code — one source's
//! total failure never stops the sources after it.
//!
//! Sources run strictly sequentially, items strictly one at a time. The
//! fetcher's rate limiter spaces requests across *all* feeds, and
//! interleaving would break that inter-request guarantee.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::convert::{self, slugify};
use crate::feed::media::html_suggests_media;
use crate::feed::{FeedFetcher, FetcherConfig};
use crate::models::{
    ConvertedArticle, FeedItem, IngestionOptions, IngestionSource, PublicationInfo,
};
use crate::storage::{ArticleIndex, ArticleLibrary};

// ============================================================================
// Outcome types
// ============================================================================

/// Why an item was deliberately not stored. Skips are reported outcomes,
/// not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The (publication, title-slug) pair is already on disk
    AlreadyExists,
    /// Published before the run's `since` cutoff
    BeforeCutoff(DateTime<Utc>),
    /// Audio/video item, by classification or by the HTML backstop
    MediaContent,
}

impl SkipReason {
    pub fn describe(&self) -> String {
        match self {
            Self::AlreadyExists => "already exists".to_string(),
            Self::BeforeCutoff(cutoff) => {
                format!("published before {}", cutoff.format("%Y-%m-%d"))
            }
            Self::MediaContent => "video/audio content".to_string(),
        }
    }
}

/// Pipeline stage where an error surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fetch,
    Store,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Store => "store",
        }
    }
}

/// One recorded failure, tagged with its phase
#[derive(Debug, Clone)]
pub struct ArticleError {
    pub phase: Phase,
    /// Item URL for store-phase errors; absent for source-level fetch errors
    pub article_url: Option<String>,
    pub message: String,
}

/// Terminal state of one feed item
#[derive(Debug)]
pub enum ArticleOutcome {
    Stored {
        slug: String,
        path: PathBuf,
    },
    /// Dry run: converted and reported, nothing written
    DryRun {
        article: Box<ConvertedArticle>,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        error: ArticleError,
    },
}

/// Result of ingesting one source
#[derive(Debug)]
pub struct SourceReport {
    pub slug: String,
    /// False only when the feed itself could not be fetched/parsed
    pub success: bool,
    pub articles_processed: usize,
    pub articles_skipped: usize,
    pub articles_stored: usize,
    pub errors: Vec<ArticleError>,
    pub duration: Duration,
}

impl SourceReport {
    fn failed(slug: &str, error: ArticleError, duration: Duration) -> Self {
        Self {
            slug: slug.to_string(),
            success: false,
            articles_processed: 0,
            articles_skipped: 0,
            articles_stored: 0,
            errors: vec![error],
            duration,
        }
    }
}

/// Aggregated result of one batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub sources: Vec<SourceReport>,
    pub duration: Duration,
}

impl BatchReport {
    /// Exit condition: every source fetched and stored without errors
    pub fn all_succeeded(&self) -> bool {
        self.sources
            .iter()
            .all(|s| s.success && s.errors.is_empty())
    }

    pub fn articles_processed(&self) -> usize {
        self.sources.iter().map(|s| s.articles_processed).sum()
    }

    pub fn articles_skipped(&self) -> usize {
        self.sources.iter().map(|s| s.articles_skipped).sum()
    }

    pub fn articles_stored(&self) -> usize {
        self.sources.iter().map(|s| s.articles_stored).sum()
    }

    pub fn error_count(&self) -> usize {
        self.sources.iter().map(|s| s.errors.len()).sum()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// The ingestion pipeline for one invocation
pub struct Pipeline {
    fetcher: FeedFetcher,
    library: ArticleLibrary,
    index: Option<ArticleIndex>,
    options: IngestionOptions,
}

impl Pipeline {
    /// Assemble a pipeline from run options
    pub fn new(options: IngestionOptions) -> Result<Self> {
        let fetcher = FeedFetcher::new(FetcherConfig {
            delay: options.delay,
            timeout: options.timeout,
            max_attempts: options.max_attempts,
            ..Default::default()
        })
        .context("Failed to create feed fetcher")?;

        let library = ArticleLibrary::new(&options.library_root);

        let index = match &options.index_db {
            Some(path) => Some(
                ArticleIndex::open(path)
                    .with_context(|| format!("Failed to open article index {}", path.display()))?,
            ),
            None => None,
        };

        Ok(Self {
            fetcher,
            library,
            index,
            options,
        })
    }

    /// Ingest every source in order, continuing past individual failures
    pub async fn run_batch(&self, sources: &[IngestionSource]) -> BatchReport {
        let started = Instant::now();
        tracing::info!(sources = sources.len(), "Starting ingestion batch");

        let mut report = BatchReport::default();
        for source in sources {
            let source_report = self.run_source(source).await;
            tracing::info!(
                source = %source_report.slug,
                success = source_report.success,
                processed = source_report.articles_processed,
                skipped = source_report.articles_skipped,
                stored = source_report.articles_stored,
                errors = source_report.errors.len(),
                "Source finished"
            );
            report.sources.push(source_report);
        }

        report.duration = started.elapsed();
        tracing::info!(
            stored = report.articles_stored(),
            skipped = report.articles_skipped(),
            errors = report.error_count(),
            duration_ms = report.duration.as_millis() as u64,
            "Batch finished"
        );
        report
    }

    /// Ingest one source: fetch once, then walk its items
    pub async fn run_source(&self, source: &IngestionSource) -> SourceReport {
        let started = Instant::now();
        tracing::debug!(source = %source.slug, url = %source.feed_url, "Fetching feed");

        let outcome = self.fetcher.fetch(&source.feed_url).await;
        let feed = match outcome.feed {
            Ok(feed) => feed,
            Err(e) => {
                tracing::warn!(source = %source.slug, error = %e, "Feed fetch failed");
                let error = ArticleError {
                    phase: Phase::Fetch,
                    article_url: None,
                    message: e.to_string(),
                };
                return SourceReport::failed(&source.slug, error, started.elapsed());
            }
        };

        if outcome.cached {
            tracing::debug!(source = %source.slug, "Feed served from cache");
        }

        let publication = source.publication();
        let mut report = SourceReport {
            slug: source.slug.clone(),
            success: true,
            articles_processed: 0,
            articles_skipped: 0,
            articles_stored: 0,
            errors: Vec::new(),
            duration: Duration::ZERO,
        };

        // the cap bounds inspected items, not stored ones
        let limit = self.options.max_articles.unwrap_or(usize::MAX);
        for item in feed.items.iter().take(limit) {
            report.articles_processed += 1;
            match self.process_item(item, source, &publication) {
                ArticleOutcome::Stored { slug, .. } => {
                    tracing::debug!(source = %source.slug, article = %slug, "Article stored");
                    report.articles_stored += 1;
                }
                ArticleOutcome::DryRun { article } => {
                    tracing::info!(
                        source = %source.slug,
                        title = %article.metadata.title,
                        words = article.metadata.word_count,
                        "Dry run: converted without storing"
                    );
                }
                ArticleOutcome::Skipped { reason } => {
                    tracing::debug!(
                        source = %source.slug,
                        title = %item.title,
                        reason = %reason.describe(),
                        "Article skipped"
                    );
                    report.articles_skipped += 1;
                }
                ArticleOutcome::Failed { error } => {
                    tracing::warn!(
                        source = %source.slug,
                        phase = error.phase.as_str(),
                        error = %error.message,
                        "Article failed"
                    );
                    report.errors.push(error);
                }
            }
        }

        report.duration = started.elapsed();
        report
    }

    /// Per-article state machine: existence, cutoff, media backstop,
    /// convert, store
    fn process_item(
        &self,
        item: &FeedItem,
        source: &IngestionSource,
        publication: &PublicationInfo,
    ) -> ArticleOutcome {
        let article_slug = slugify(&item.title);

        if !article_slug.is_empty() && self.library.exists(&publication.slug, &article_slug) {
            return ArticleOutcome::Skipped {
                reason: SkipReason::AlreadyExists,
            };
        }

        if let Some(since) = self.options.since {
            if item.published_at < since {
                return ArticleOutcome::Skipped {
                    reason: SkipReason::BeforeCutoff(since),
                };
            }
        }

        // backstop in addition to the parser's classification, for feeds
        // whose structured metadata under-reports media content
        if item.media_type.is_media() || html_suggests_media(&item.content_html) {
            return ArticleOutcome::Skipped {
                reason: SkipReason::MediaContent,
            };
        }

        let article = {
            let mut item = item.clone();
            if let Some(author) = &source.author {
                item.author = author.clone();
            }
            convert::convert(&item, publication)
        };

        if self.options.dry_run {
            return ArticleOutcome::DryRun {
                article: Box::new(article),
            };
        }

        match self.library.store(&article) {
            Ok(path) => {
                if let Some(index) = &self.index {
                    // the file is the source of truth; a failed index write
                    // is logged, not fatal
                    if let Err(e) = index.record(&article, &path) {
                        tracing::warn!(error = %e, "Failed to update article index");
                    }
                }
                ArticleOutcome::Stored {
                    slug: article_slug,
                    path,
                }
            }
            Err(e) => ArticleOutcome::Failed {
                error: ArticleError {
                    phase: Phase::Store,
                    article_url: Some(item.url.clone()),
                    message: e.to_string(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_skip_reason_wording() {
        assert_eq!(SkipReason::AlreadyExists.describe(), "already exists");
        assert_eq!(SkipReason::MediaContent.describe(), "video/audio content");

        let cutoff = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            SkipReason::BeforeCutoff(cutoff).describe(),
            "published before 2025-06-01"
        );
    }

    #[test]
    fn test_phase_tags() {
        assert_eq!(Phase::Fetch.as_str(), "fetch");
        assert_eq!(Phase::Store.as_str(), "store");
    }

    #[test]
    fn test_batch_report_aggregation() {
        let mut report = BatchReport::default();
        report.sources.push(SourceReport {
            slug: "a".to_string(),
            success: true,
            articles_processed: 3,
            articles_skipped: 1,
            articles_stored: 2,
            errors: vec![],
            duration: Duration::ZERO,
        });
        report.sources.push(SourceReport::failed(
            "b",
            ArticleError {
                phase: Phase::Fetch,
                article_url: None,
                message: "boom".to_string(),
            },
            Duration::ZERO,
        ));

        assert_eq!(report.articles_processed(), 3);
        assert_eq!(report.articles_skipped(), 1);
        assert_eq!(report.articles_stored(), 2);
        assert_eq!(report.error_count(), 1);
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_all_succeeded_requires_clean_errors() {
        let mut report = BatchReport::default();
        report.sources.push(SourceReport {
            slug: "a".to_string(),
            success: true,
            articles_processed: 1,
            articles_skipped: 0,
            articles_stored: 0,
            errors: vec![ArticleError {
                phase: Phase::Store,
                article_url: Some("https://x.test/p/1".to_string()),
                message: "disk full".to_string(),
            }],
            duration: Duration::ZERO,
        });
        assert!(!report.all_succeeded());

        report.sources[0].errors.clear();
        assert!(report.all_succeeded());
    }
}
