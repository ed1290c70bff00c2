//! Feed item to article conversion
//!
//! A pure transformation: one [`FeedItem`] plus its publication identity in,
//! one [`ConvertedArticle`] out. No I/O happens here, which keeps the whole
//! stage trivially testable.

pub mod frontmatter;
pub mod links;
pub mod markdown;

pub use frontmatter::{generate_frontmatter, parse_frontmatter, slugify, Frontmatter};

use crate::models::{ArticleMetadata, ConvertedArticle, FeedItem, PublicationInfo};

/// Convert one feed item into a stored-article candidate
pub fn convert(item: &FeedItem, publication: &PublicationInfo) -> ConvertedArticle {
    let body_markdown = markdown::html_to_markdown(&item.content_html);
    let extracted = links::extract_links(&item.content_html, &item.url);
    let word_count = markdown::word_count(&item.content_html);

    let metadata = ArticleMetadata {
        title: item.title.clone(),
        author: item.author.clone(),
        publication: publication.name.clone(),
        publication_slug: publication.slug.clone(),
        published_at: item.published_at,
        source_url: item.url.clone(),
        word_count,
        estimated_read_time: markdown::read_time(word_count),
        tags: publication.tags.clone(),
    };

    ConvertedArticle {
        metadata,
        markdown: body_markdown,
        links: extracted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LinkKind, MediaType};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn sample_item() -> FeedItem {
        FeedItem {
            title: "Market Notes".to_string(),
            url: "https://example.substack.com/p/market-notes".to_string(),
            published_at: Utc.with_ymd_and_hms(2025, 6, 1, 10, 30, 0).unwrap(),
            author: "Jane Doe".to_string(),
            content_html: concat!(
                "<p>Two hundred words of wisdom, give or take. ",
                "See <a href=\"https://other.substack.com/p/context\">context</a>.</p>"
            )
            .to_string(),
            summary: None,
            media_type: MediaType::Text,
            image_url: None,
            guid: None,
            categories: vec![],
        }
    }

    fn sample_publication() -> PublicationInfo {
        PublicationInfo {
            name: "Example Letter".to_string(),
            slug: "example".to_string(),
            tags: BTreeMap::from([("topic".to_string(), "finance".to_string())]),
        }
    }

    #[test]
    fn test_convert_builds_metadata() {
        let article = convert(&sample_item(), &sample_publication());
        let meta = &article.metadata;

        assert_eq!(meta.title, "Market Notes");
        assert_eq!(meta.author, "Jane Doe");
        assert_eq!(meta.publication_slug, "example");
        assert_eq!(meta.source_url, "https://example.substack.com/p/market-notes");
        assert!(meta.word_count > 0);
        assert_eq!(meta.estimated_read_time, 1);
        assert_eq!(meta.tags.get("topic").map(String::as_str), Some("finance"));
    }

    #[test]
    fn test_convert_renders_markdown_and_links() {
        let article = convert(&sample_item(), &sample_publication());
        assert!(article.markdown.contains("[context](https://other.substack.com/p/context)"));
        assert_eq!(article.links.len(), 1);
        assert_eq!(article.links[0].kind, LinkKind::CrossPublication);
        assert_eq!(article.links[0].target_slug.as_deref(), Some("other/context"));
    }
}
