//! Common utilities and helpers

pub mod error;
pub mod retry;

pub use error::{ConfigError, FetchError, ParseError, StorageError};
pub use retry::{with_retry_if, RetryConfig};
