//! Durable article storage
//!
//! [`library`] owns the Markdown files that are the system's source of
//! truth; [`index`] is an optional SQLite mirror for relational callers.

pub mod index;
pub mod library;

pub use index::ArticleIndex;
pub use library::{ArticleLibrary, LibraryStats};
