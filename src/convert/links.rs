//! Outbound link extraction and classification
//!
//! Links are pulled from the raw HTML (not the rendered Markdown) and
//! classified by host against the source article: same host is internal, a
//! sibling publication on the same hosting platform is cross-publication,
//! anything else — including every URL that fails to parse — is external.

use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::Url;

use crate::models::{ExtractedLink, LinkKind};

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Extract and classify every usable anchor in an HTML body
pub fn extract_links(html: &str, source_url: &str) -> Vec<ExtractedLink> {
    let fragment = Html::parse_fragment(html);
    let source_host = Url::parse(source_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));

    let mut links = Vec::new();
    for anchor in fragment.select(&ANCHOR_SELECTOR) {
        let href = anchor.value().attr("href").unwrap_or_default().trim();
        if skip_target(href) {
            continue;
        }

        let text = anchor
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        let (kind, target_slug) = classify(href, source_host.as_deref());
        links.push(ExtractedLink {
            url: href.to_string(),
            text,
            kind,
            target_slug,
        });
    }
    links
}

/// Anchors that are navigation artifacts, not outbound links
fn skip_target(href: &str) -> bool {
    href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("javascript:")
}

/// Classify one href against the source host
fn classify(href: &str, source_host: Option<&str>) -> (LinkKind, Option<String>) {
    // malformed URLs are conservatively external
    let Ok(link_url) = Url::parse(href) else {
        return (LinkKind::External, None);
    };
    let Some(link_host) = link_url.host_str() else {
        return (LinkKind::External, None);
    };
    let Some(source_host) = source_host else {
        return (LinkKind::External, None);
    };

    if link_host == source_host {
        return (LinkKind::Internal, None);
    }

    let suffix = platform_suffix(source_host);
    if link_host == suffix || link_host.ends_with(&format!(".{suffix}")) {
        return (LinkKind::CrossPublication, target_slug(&link_url, suffix));
    }

    (LinkKind::External, None)
}

/// The hosting platform's domain suffix: the source host with its
/// publication subdomain removed (`a.substack.com` -> `substack.com`).
/// Hosts without a subdomain are their own suffix.
fn platform_suffix(host: &str) -> &str {
    if host.matches('.').count() >= 2 {
        match host.split_once('.') {
            Some((_, rest)) => rest,
            None => host,
        }
    } else {
        host
    }
}

/// `{subdomain}/{post-slug}` for a platform-internal cross-link
fn target_slug(link_url: &Url, suffix: &str) -> Option<String> {
    let host = link_url.host_str()?;
    let subdomain = host.strip_suffix(suffix)?.strip_suffix('.')?;
    if subdomain.is_empty() {
        return None;
    }

    let post = link_url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()?;
    if post.is_empty() || post == "p" {
        return None;
    }

    Some(format!("{subdomain}/{post}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "https://a.substack.com/p/y";

    fn classify_one(href: &str) -> ExtractedLink {
        let html = format!(r#"<p><a href="{href}">link</a></p>"#);
        let links = extract_links(&html, SOURCE);
        assert_eq!(links.len(), 1);
        links.into_iter().next().unwrap()
    }

    #[test]
    fn test_same_host_is_internal() {
        let link = classify_one("https://a.substack.com/p/x");
        assert_eq!(link.kind, LinkKind::Internal);
        assert!(link.target_slug.is_none());
    }

    #[test]
    fn test_sibling_publication_is_cross_publication() {
        let html = r#"<p><a href="https://a.substack.com/p/x">post</a></p>"#;
        let links = extract_links(html, "https://b.substack.com/p/y");
        assert_eq!(links[0].kind, LinkKind::CrossPublication);
        assert_eq!(links[0].target_slug.as_deref(), Some("a/x"));
    }

    #[test]
    fn test_other_domain_is_external() {
        let link = classify_one("https://news.ycombinator.com/item?id=1");
        assert_eq!(link.kind, LinkKind::External);
        assert!(link.target_slug.is_none());
    }

    #[test]
    fn test_malformed_url_is_external() {
        let link = classify_one("/relative/path");
        assert_eq!(link.kind, LinkKind::External);
    }

    #[test]
    fn test_navigation_artifacts_skipped() {
        let html = r##"
            <a href="">empty</a>
            <a href="#">hash</a>
            <a href="#section">fragment</a>
            <a href="mailto:hi@example.com">mail</a>
            <a href="javascript:void(0)">js</a>
            <a href="https://kept.example.com/x">kept</a>
        "##;
        let links = extract_links(html, SOURCE);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://kept.example.com/x");
    }

    #[test]
    fn test_anchor_text_collected() {
        let html = r#"<a href="https://x.test/a">read   <em>this</em></a>"#;
        let links = extract_links(html, SOURCE);
        assert_eq!(links[0].text, "read this");
    }

    #[test]
    fn test_platform_apex_has_no_target_slug() {
        let link = classify_one("https://substack.com/home");
        assert_eq!(link.kind, LinkKind::CrossPublication);
        assert!(link.target_slug.is_none());
    }

    #[test]
    fn test_platform_suffix() {
        assert_eq!(platform_suffix("a.substack.com"), "substack.com");
        assert_eq!(platform_suffix("example.com"), "example.com");
        assert_eq!(platform_suffix("deep.a.substack.com"), "a.substack.com");
    }
}
