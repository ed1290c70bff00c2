//! YAML frontmatter rendering and recovery, plus slug derivation
//!
//! The frontmatter block is rendered directly rather than through a YAML
//! library: the on-disk format fixes the key order and the escaping rules,
//! and files written once must keep byte-stable shape across versions. The
//! parser is deliberately best-effort — it recovers key/value pairs (and one
//! level of nested tags) from previously written files without requiring a
//! database.

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

use crate::models::ArticleMetadata;

/// Maximum slug length in characters
const MAX_SLUG_LEN: usize = 100;

/// Derive a filesystem slug from a title.
///
/// Lowercase, strip everything but alphanumerics/spaces/hyphens, collapse
/// whitespace and hyphen runs into single hyphens, trim, cap at 100 chars.
/// Idempotent: slugging a slug returns it unchanged.
pub fn slugify(input: &str) -> String {
    let mut slug = String::new();
    let mut pending_separator = false;

    for c in input.to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_separator = true;
        }
        // every other character is stripped without leaving a separator
    }

    let truncated: String = slug.chars().take(MAX_SLUG_LEN).collect();
    truncated.trim_matches('-').to_string()
}

/// Render the deterministic frontmatter block, trailing `---` included
pub fn generate_frontmatter(meta: &ArticleMetadata) -> String {
    let mut out = String::from("---\n");
    out.push_str(&format!("title: \"{}\"\n", escape(&meta.title)));
    out.push_str(&format!("author: \"{}\"\n", escape(&meta.author)));
    out.push_str(&format!("publication: \"{}\"\n", escape(&meta.publication)));
    out.push_str(&format!("publication_slug: {}\n", meta.publication_slug));
    out.push_str(&format!(
        "published_at: \"{}\"\n",
        meta.published_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    out.push_str(&format!("source_url: \"{}\"\n", escape(&meta.source_url)));
    out.push_str(&format!("word_count: {}\n", meta.word_count));
    out.push_str(&format!(
        "estimated_read_time: {}\n",
        meta.estimated_read_time
    ));
    if !meta.tags.is_empty() {
        out.push_str("tags:\n");
        // BTreeMap iteration keeps the rendering deterministic
        for (key, value) in &meta.tags {
            out.push_str(&format!("  {}: \"{}\"\n", key, escape(value)));
        }
    }
    out.push_str("---");
    out
}

/// Frontmatter recovered from a previously written file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publication: Option<String>,
    pub publication_slug: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub source_url: Option<String>,
    pub word_count: Option<usize>,
    pub estimated_read_time: Option<usize>,
    pub tags: BTreeMap<String, String>,
}

/// Best-effort recovery of a frontmatter block from file content.
///
/// Returns `None` when the content does not start with a `---` block.
/// Unknown keys are ignored; unparseable values are dropped, never fatal.
pub fn parse_frontmatter(content: &str) -> Option<Frontmatter> {
    let mut lines = content.lines();
    if lines.next()?.trim_end() != "---" {
        return None;
    }

    let mut fm = Frontmatter::default();
    let mut in_tags = false;

    for line in lines {
        if line.trim_end() == "---" {
            return Some(fm);
        }

        if in_tags {
            if let Some(nested) = line.strip_prefix("  ") {
                if let Some((key, value)) = split_key_value(nested) {
                    fm.tags.insert(key.to_string(), unquote(value));
                    continue;
                }
            }
            in_tags = false;
        }

        let Some((key, value)) = split_key_value(line) else {
            continue;
        };

        match key {
            "tags" if value.is_empty() => in_tags = true,
            "title" => fm.title = Some(unquote(value)),
            "author" => fm.author = Some(unquote(value)),
            "publication" => fm.publication = Some(unquote(value)),
            "publication_slug" => fm.publication_slug = Some(unquote(value)),
            "published_at" => {
                fm.published_at = DateTime::parse_from_rfc3339(&unquote(value))
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc));
            }
            "source_url" => fm.source_url = Some(unquote(value)),
            "word_count" => fm.word_count = unquote(value).parse().ok(),
            "estimated_read_time" => fm.estimated_read_time = unquote(value).parse().ok(),
            _ => {}
        }
    }

    // unterminated block: keep whatever was recovered
    Some(fm)
}

// ============================================================================
// Escaping
// ============================================================================

/// Escape a string value for a double-quoted frontmatter field
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }
    out
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || key.contains(' ') {
        return None;
    }
    Some((key, value.trim()))
}

fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        unescape(&trimmed[1..trimmed.len() - 1])
    } else {
        trimmed.to_string()
    }
}
