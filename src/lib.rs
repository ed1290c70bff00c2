//! siphon - newsletter feed archiver
//!
//! Ingests newsletter/blog feeds (RSS 2.0 and Atom), converts each post's
//! HTML body into Markdown with YAML frontmatter, and files it into a
//! per-publication library on disk, exactly once per (publication, article)
//! pair.
//!
//! # Architecture
//!
//! The library is organized into several modules, leaves first:
//!
//! - [`models`] - Core data structures and types
//! - [`feed`] - Feed fetching (cache, rate limit, retry) and RSS/Atom parsing
//! - [`convert`] - HTML to Markdown, link extraction, frontmatter
//! - [`storage`] - Markdown library and the optional SQLite article index
//! - [`pipeline`] - Per-source and batch orchestration
//! - [`config`] - Sources file loading
//! - [`utils`] - Error taxonomy and retry helpers
//!
//! # Example
//!
//! ```no_run
//! use siphon::models::{IngestionOptions, IngestionSource};
//! use siphon::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sources = vec![IngestionSource {
//!         name: "Example Letter".to_string(),
//!         slug: "example".to_string(),
//!         feed_url: "https://example.substack.com/feed".to_string(),
//!         author: None,
//!         tags: Default::default(),
//!     }];
//!
//!     let pipeline = Pipeline::new(IngestionOptions::default())?;
//!     let report = pipeline.run_batch(&sources).await;
//!     println!("stored {} articles", report.articles_stored());
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod config;
pub mod convert;
pub mod feed;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod utils;
