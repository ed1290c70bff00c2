//! Sources file loading and validation
//!
//! Publications arrive as a TOML file of `[[sources]]` entries. The file is
//! required — there is nothing useful to do without sources — and every
//! entry is validated up front so a typo fails the run before any network
//! traffic.
//!
//! ```toml
//! [[sources]]
//! name = "Example Letter"
//! slug = "example"
//! feed_url = "https://example.substack.com/feed"
//! author = "Jane Doe"          # optional override
//!
//! [sources.tags]               # optional, copied into frontmatter
//! topic = "finance"
//! ```

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

use crate::models::IngestionSource;
use crate::utils::error::ConfigError;

#[derive(Debug, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    sources: Vec<IngestionSource>,
}

/// Load and validate the sources file
pub fn load_sources(path: &Path) -> Result<Vec<IngestionSource>, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let file: SourcesFile = toml::from_str(&content)?;

    if file.sources.is_empty() {
        return Err(ConfigError::Empty);
    }

    let mut seen = HashSet::new();
    for source in &file.sources {
        validate_source(source)?;
        if !seen.insert(source.slug.as_str()) {
            return Err(ConfigError::InvalidSource {
                slug: source.slug.clone(),
                reason: "duplicate slug".to_string(),
            });
        }
    }

    tracing::info!(path = %path.display(), sources = file.sources.len(), "Loaded sources");
    Ok(file.sources)
}

fn validate_source(source: &IngestionSource) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidSource {
        slug: source.slug.clone(),
        reason: reason.to_string(),
    };

    if source.name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if source.slug.is_empty() {
        return Err(invalid("slug must not be empty"));
    }
    // the slug names a directory; keep it boring
    if !source
        .slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            "slug may only contain lowercase letters, digits, and hyphens",
        ));
    }

    match Url::parse(&source.feed_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        Ok(_) => Err(invalid("feed_url must be an http(s) URL")),
        Err(_) => Err(invalid("feed_url is not a valid URL")),
    }
}
