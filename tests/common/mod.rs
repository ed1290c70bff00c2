//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use siphon::models::{IngestionOptions, IngestionSource};

/// RSS feed with one podcast item and one plain article, the canonical
/// mixed-media scenario
pub const MIXED_MEDIA_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Example Letter</title>
    <link>https://example.substack.com</link>
    <description>A newsletter</description>
    <item>
      <title>Weekly Podcast Recap</title>
      <link>https://example.substack.com/p/weekly-podcast-recap</link>
      <pubDate>Tue, 01 Jul 2025 09:00:00 GMT</pubDate>
      <content:encoded><![CDATA[<p>Episode notes.</p><audio src="https://cdn.example.com/ep7.mp3"></audio>]]></content:encoded>
    </item>
    <item>
      <title>Market Notes</title>
      <link>https://example.substack.com/p/market-notes</link>
      <pubDate>Wed, 02 Jul 2025 09:00:00 GMT</pubDate>
      <content:encoded><![CDATA[<p>Plain prose about markets, nothing fancy.</p>]]></content:encoded>
    </item>
  </channel>
</rss>"#;

/// Single-item RSS feed with a fixed publication date
pub fn single_item_rss(title: &str, link: &str, pub_date: &str, body_html: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Example Letter</title>
    <link>https://example.substack.com</link>
    <item>
      <title>{title}</title>
      <link>{link}</link>
      <pubDate>{pub_date}</pubDate>
      <content:encoded><![CDATA[{body_html}]]></content:encoded>
    </item>
  </channel>
</rss>"#
    )
}

pub fn source(slug: &str, feed_url: &str) -> IngestionSource {
    IngestionSource {
        name: format!("{slug} letter"),
        slug: slug.to_string(),
        feed_url: feed_url.to_string(),
        author: None,
        tags: BTreeMap::new(),
    }
}

/// Fast options for tests: no inter-fetch delay, single attempt
pub fn options(library_root: &Path) -> IngestionOptions {
    IngestionOptions {
        library_root: library_root.to_path_buf(),
        delay: Duration::ZERO,
        timeout: Duration::from_secs(5),
        max_attempts: 1,
        ..Default::default()
    }
}
