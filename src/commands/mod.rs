//! CLI command implementations

pub mod ingest;
pub mod library;

pub use ingest::{ingest, ReportFormat};
pub use library::{list, stats};
