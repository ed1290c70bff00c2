//! Error types for the siphon feed archiver
//!
//! Every fallible public operation in this crate returns one of these as a
//! result value; nothing crosses a component boundary as a panic.

use thiserror::Error;

/// Errors that can occur while parsing feed XML
#[derive(Error, Debug)]
pub enum ParseError {
    /// Root element is neither `rss` nor `feed`; fatal for the fetch, never retried
    #[error("Unrecognized feed root element: <{0}>")]
    UnrecognizedRoot(String),

    /// Document has no root element at all
    #[error("Empty or truncated XML document")]
    EmptyDocument,

    /// Malformed XML; treated as transient (truncated responses happen)
    #[error("XML error: {0}")]
    Xml(String),
}

/// Errors that can occur during HTTP feed fetching
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS)
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// HTTP 4xx: the request itself is wrong, never retried
    #[error("Client error: status {0}")]
    ClientStatus(u16),

    /// Non-2xx, non-4xx HTTP status
    #[error("Server error: status {0}")]
    ServerStatus(u16),

    /// Per-attempt deadline exceeded
    #[error("Request timeout")]
    Timeout,

    /// Response body exceeded the size cap
    #[error("Response too large: {0} bytes")]
    ResponseTooLarge(usize),

    /// Response bytes could not be decoded as text
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Feed XML could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl FetchError {
    /// True when the error is transient and another attempt is warranted.
    ///
    /// 4xx statuses and unrecognized feed formats are structural: retrying
    /// cannot change the outcome.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_)
            | FetchError::ServerStatus(_)
            | FetchError::Timeout
            | FetchError::Parse(ParseError::Xml(_))
            | FetchError::Parse(ParseError::EmptyDocument) => true,
            FetchError::ClientStatus(_)
            | FetchError::ResponseTooLarge(_)
            | FetchError::Decode(_)
            | FetchError::Parse(ParseError::UnrecognizedRoot(_)) => false,
        }
    }
}

/// Errors that can occur while writing or reading the Markdown library
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem I/O failure
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Article slug came out empty (untitled item)
    #[error("Cannot derive a file name from title {0:?}")]
    EmptySlug(String),
}

impl StorageError {
    /// Attach the offending path to an I/O error
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Errors raised while loading the sources file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read sources file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in sources file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid source {slug:?}: {reason}")]
    InvalidSource { slug: String, reason: String },

    #[error("Sources file defines no sources")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::Timeout.is_retryable());
        assert!(FetchError::ServerStatus(500).is_retryable());
        assert!(FetchError::Parse(ParseError::Xml("unclosed tag".into())).is_retryable());

        assert!(!FetchError::ClientStatus(404).is_retryable());
        assert!(!FetchError::ClientStatus(429).is_retryable());
        assert!(!FetchError::Parse(ParseError::UnrecognizedRoot("html".into())).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = ParseError::UnrecognizedRoot("opml".into());
        assert!(err.to_string().contains("opml"));

        let err = FetchError::ServerStatus(503);
        assert!(err.to_string().contains("503"));
    }
}
