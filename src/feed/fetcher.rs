//! HTTP feed fetcher with caching, rate limiting, and retry
//!
//! The fetcher owns all of its state: an in-memory response cache with a
//! short TTL, a single rate limiter shared across every feed it touches
//! (the inter-request delay applies globally, not per host), and the retry
//! policy. Nothing here is process-global, so two fetchers never interfere
//! and tests construct them freely.

use chrono::{DateTime, Utc};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::header::CONTENT_TYPE;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::feed::parser;
use crate::models::Feed;
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Cached responses younger than this are served without a network request
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Response bodies larger than this are rejected
const MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

/// Fetcher configuration
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Minimum interval between network attempts, across all feeds
    pub delay: Duration,

    /// Per-attempt HTTP deadline
    pub timeout: Duration,

    /// Attempts per fetch, including the first
    pub max_attempts: u32,

    /// Cache entry lifetime
    pub cache_ttl: Duration,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            cache_ttl: DEFAULT_CACHE_TTL,
            user_agent: format!("siphon/{} (feed archiver)", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Result of one fetch: the feed or the last error, plus provenance
#[derive(Debug)]
pub struct FetchOutcome {
    pub feed: Result<Feed, FetchError>,
    /// Served from the in-memory cache without a network request
    pub cached: bool,
    pub fetched_at: DateTime<Utc>,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        self.feed.is_ok()
    }
}

struct CacheEntry {
    feed: Feed,
    stored_at: Instant,
}

/// Feed fetcher owning its HTTP client, rate limiter, and cache
pub struct FeedFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
    /// None when the configured delay is zero
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

impl FeedFetcher {
    /// Create a fetcher with the given configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Network` if the HTTP client cannot be built.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .gzip(true)
            .build()?;

        let limiter = Quota::with_period(config.delay).map(RateLimiter::direct);

        Ok(Self {
            client,
            config,
            limiter,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Fetch and parse one feed. Never panics; the outcome carries either
    /// the parsed feed or the last error after retries are exhausted.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let fetched_at = Utc::now();

        if let Some(feed) = self.cache_lookup(url) {
            tracing::debug!(url, "Feed served from cache");
            return FetchOutcome {
                feed: Ok(feed),
                cached: true,
                fetched_at,
            };
        }

        let retry = RetryConfig::new(self.config.max_attempts, self.config.delay);
        let result = with_retry_if(
            &retry,
            |attempt| self.attempt(url, attempt),
            FetchError::is_retryable,
        )
        .await;

        if let Ok(feed) = &result {
            self.cache_store(url, feed.clone());
        }

        FetchOutcome {
            feed: result,
            cached: false,
            fetched_at,
        }
    }

    /// One network attempt: rate-limit gate, bounded request, decode, parse
    async fn attempt(&self, url: &str, attempt: u32) -> Result<Feed, FetchError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        tracing::debug!(url, attempt, "Fetching feed");

        // one deadline covers the whole HTTP exchange, headers and body
        let (bytes, content_type) = tokio::time::timeout(self.config.timeout, self.request(url))
            .await
            .map_err(|_| FetchError::Timeout)??;

        let text = decode_body(&bytes, content_type.as_deref())?;
        let feed = parser::parse(&text, url)?;

        tracing::debug!(url, items = feed.items.len(), "Feed parsed");
        Ok(feed)
    }

    /// Issue the HTTP request and collect the body, without a deadline
    async fn request(&self, url: &str) -> Result<(bytes::Bytes, Option<String>), FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::Network)?;

        let status = response.status();
        if status.is_client_error() {
            return Err(FetchError::ClientStatus(status.as_u16()));
        }
        if !status.is_success() {
            return Err(FetchError::ServerStatus(status.as_u16()));
        }

        if let Some(len) = response.content_length() {
            if len as usize > MAX_RESPONSE_BYTES {
                return Err(FetchError::ResponseTooLarge(len as usize));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await.map_err(FetchError::Network)?;
        if bytes.len() > MAX_RESPONSE_BYTES {
            return Err(FetchError::ResponseTooLarge(bytes.len()));
        }

        Ok((bytes, content_type))
    }

    fn cache_lookup(&self, url: &str) -> Option<Feed> {
        let mut cache = self.cache.lock().expect("fetcher cache poisoned");
        match cache.get(url) {
            Some(entry) if entry.stored_at.elapsed() < self.config.cache_ttl => {
                Some(entry.feed.clone())
            }
            Some(_) => {
                cache.remove(url);
                None
            }
            None => None,
        }
    }

    fn cache_store(&self, url: &str, feed: Feed) {
        let mut cache = self.cache.lock().expect("fetcher cache poisoned");
        cache.insert(
            url.to_string(),
            CacheEntry {
                feed,
                stored_at: Instant::now(),
            },
        );
    }
}

// ============================================================================
// Body decoding
// ============================================================================

/// Decode response bytes to text. UTF-8 fast path; otherwise the charset
/// from the Content-Type header or the XML declaration decides.
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Result<String, FetchError> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }

    let label = content_type
        .and_then(charset_from_content_type)
        .or_else(|| charset_from_xml_decl(bytes));

    match label.and_then(|l| encoding_rs::Encoding::for_label(l.as_bytes())) {
        Some(encoding) => {
            let (text, _, _) = encoding.decode(bytes);
            Ok(text.into_owned())
        }
        None => Err(FetchError::Decode(
            "response is not valid UTF-8 and declares no known charset".to_string(),
        )),
    }
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|part| {
        let part = part.trim();
        part.strip_prefix("charset=")
            .map(|v| v.trim_matches('"').to_string())
    })
}

/// Pull `encoding="..."` out of the XML declaration, which is ASCII even
/// when the rest of the document is not
fn charset_from_xml_decl(bytes: &[u8]) -> Option<String> {
    let head: String = bytes
        .iter()
        .take(256)
        .map(|&b| if b.is_ascii() { b as char } else { '\u{FFFD}' })
        .collect();
    let start = head.find("encoding=")? + "encoding=".len();
    let rest = &head[start..];
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let end = rest[1..].find(quote)?;
    Some(rest[1..1 + end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetcherConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(900));
        assert_eq!(config.max_attempts, 3);
        assert!(config.user_agent.starts_with("siphon/"));
    }

    #[test]
    fn test_zero_delay_disables_limiter() {
        let config = FetcherConfig {
            delay: Duration::ZERO,
            ..Default::default()
        };
        let fetcher = FeedFetcher::new(config).unwrap();
        assert!(fetcher.limiter.is_none());
    }

    #[test]
    fn test_decode_utf8_fast_path() {
        let text = decode_body("café".as_bytes(), None).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn test_decode_declared_charset() {
        // "caf\xe9" is latin-1 for café
        let bytes = b"caf\xe9";
        let text = decode_body(bytes, Some("text/xml; charset=iso-8859-1")).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn test_decode_charset_from_xml_decl() {
        let mut bytes = b"<?xml version=\"1.0\" encoding=\"windows-1252\"?><x>".to_vec();
        bytes.push(0xe9);
        bytes.extend_from_slice(b"</x>");
        let text = decode_body(&bytes, None).unwrap();
        assert!(text.contains('é'));
    }

    #[test]
    fn test_decode_undeclared_binary_fails() {
        let bytes = [0xff, 0xfe, 0x00, 0x01];
        assert!(matches!(
            decode_body(&bytes, None),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_charset_from_content_type() {
        assert_eq!(
            charset_from_content_type("application/rss+xml; charset=UTF-8"),
            Some("UTF-8".to_string())
        );
        assert_eq!(charset_from_content_type("text/xml"), None);
    }
}
