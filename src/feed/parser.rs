//! RSS 2.0 / Atom feed parser
//!
//! Turns raw feed XML into the canonical [`Feed`]/[`FeedItem`] model. The two
//! dialects arrive with wildly inconsistent vendor extensions; every
//! string-or-wrapped-node shape (GUIDs, categories, CDATA bodies) funnels
//! through one [`TextValue`] normalization so the mapping code stays flat.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use crate::feed::media::{classify_media, MediaSignals};
use crate::models::{Feed, FeedItem};
use crate::utils::error::ParseError;

/// Parse a feed document, dispatching on the root element.
///
/// `requested_url` is recorded as the feed URL unless the document declares
/// a `rel="self"` link.
///
/// # Errors
///
/// Returns [`ParseError::UnrecognizedRoot`] when the root element is neither
/// `rss` nor `feed`, and [`ParseError::Xml`] for malformed XML.
pub fn parse(raw_xml: &str, requested_url: &str) -> Result<Feed, ParseError> {
    let fetched_at = Utc::now();
    parse_at(raw_xml, requested_url, fetched_at)
}

/// [`parse`] with an explicit fetch timestamp (the default for items whose
/// published date is absent or unparseable).
pub fn parse_at(
    raw_xml: &str,
    requested_url: &str,
    fetched_at: DateTime<Utc>,
) -> Result<Feed, ParseError> {
    match root_element(raw_xml)? {
        RootKind::Rss => parse_rss(raw_xml, requested_url, fetched_at),
        RootKind::Atom => parse_atom(raw_xml, requested_url, fetched_at),
    }
}

enum RootKind {
    Rss,
    Atom,
}

/// Identify the document's root element without deserializing the whole tree.
fn root_element(raw_xml: &str) -> Result<RootKind, ParseError> {
    let mut reader = Reader::from_str(raw_xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                return match e.local_name().as_ref() {
                    b"rss" => Ok(RootKind::Rss),
                    b"feed" => Ok(RootKind::Atom),
                    _ => Err(ParseError::UnrecognizedRoot(name)),
                };
            }
            Ok(Event::Eof) => return Err(ParseError::EmptyDocument),
            Ok(_) => continue,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
        }
    }
}

// ============================================================================
// Shared XML shapes
// ============================================================================

/// An element whose payload is its text content, regardless of whether the
/// feed wraps it in attributes (`<guid isPermaLink="false">x</guid>`) or
/// leaves it bare (`<guid>x</guid>`). One shape, one normalization.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TextValue {
    #[serde(rename = "$text")]
    text: Option<String>,
}

impl TextValue {
    /// Trimmed, non-empty text content
    fn into_text(self) -> Option<String> {
        self.text
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

fn text_of(value: Option<TextValue>) -> Option<String> {
    value.and_then(TextValue::into_text)
}

/// RSS enclosure or Media-RSS `media:content`
#[derive(Debug, Deserialize)]
struct MediaAttachment {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@type")]
    mime_type: Option<String>,
    #[serde(rename = "@medium")]
    medium: Option<String>,
}

// ============================================================================
// RSS 2.0
// ============================================================================

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    title: Option<TextValue>,
    link: Option<TextValue>,
    description: Option<TextValue>,
    #[serde(rename = "lastBuildDate")]
    last_build_date: Option<TextValue>,
    #[serde(rename = "dc:creator", alias = "creator")]
    creator: Option<TextValue>,
    #[serde(rename = "managingEditor")]
    managing_editor: Option<TextValue>,
    /// `<atom:link rel="self">` carries the canonical feed URL
    #[serde(rename = "atom:link", default)]
    atom_links: Vec<RelLink>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<TextValue>,
    link: Option<TextValue>,
    guid: Option<TextValue>,
    #[serde(rename = "pubDate")]
    pub_date: Option<TextValue>,
    description: Option<TextValue>,
    #[serde(rename = "content:encoded", alias = "encoded")]
    content_encoded: Option<TextValue>,
    #[serde(rename = "dc:creator", alias = "creator")]
    creator: Option<TextValue>,
    author: Option<TextValue>,
    enclosure: Option<MediaAttachment>,
    #[serde(rename = "media:content", default)]
    media_content: Vec<MediaAttachment>,
    #[serde(rename = "category", default)]
    categories: Vec<TextValue>,
}

fn parse_rss(
    raw_xml: &str,
    requested_url: &str,
    fetched_at: DateTime<Utc>,
) -> Result<Feed, ParseError> {
    let doc: RssDocument =
        quick_xml::de::from_str(raw_xml).map_err(|e| ParseError::Xml(e.to_string()))?;
    let channel = doc.channel;

    let feed_title = text_of(channel.title).unwrap_or_else(|| "Untitled".to_string());
    let feed_author = text_of(channel.creator).or_else(|| text_of(channel.managing_editor));
    let feed_url = channel
        .atom_links
        .iter()
        .find(|l| l.rel.as_deref() == Some("self"))
        .and_then(|l| l.href.clone())
        .unwrap_or_else(|| requested_url.to_string());

    let items = channel
        .items
        .into_iter()
        .map(|item| rss_item(item, &feed_title, feed_author.as_deref(), fetched_at))
        .collect();

    Ok(Feed {
        title: feed_title,
        description: text_of(channel.description),
        site_url: text_of(channel.link),
        feed_url,
        author: feed_author,
        last_build: text_of(channel.last_build_date)
            .as_deref()
            .and_then(parse_date),
        items,
    })
}

fn rss_item(
    item: RssItem,
    feed_title: &str,
    feed_author: Option<&str>,
    fetched_at: DateTime<Utc>,
) -> FeedItem {
    let description = text_of(item.description);
    let content_encoded = text_of(item.content_encoded);

    // content:encoded wins; a differing description survives as the summary
    let (content_html, summary) = match (content_encoded, description) {
        (Some(content), Some(desc)) if desc != content => (content, Some(desc)),
        (Some(content), _) => (content, None),
        (None, desc) => (desc.unwrap_or_default(), None),
    };

    let guid = text_of(item.guid);
    let url = text_of(item.link)
        .or_else(|| guid.clone().filter(|g| g.starts_with("http")))
        .unwrap_or_default();

    let author = text_of(item.creator)
        .or_else(|| text_of(item.author))
        .or_else(|| feed_author.map(str::to_string))
        .unwrap_or_else(|| feed_title.to_string());

    let categories: Vec<String> = item
        .categories
        .into_iter()
        .filter_map(TextValue::into_text)
        .collect();

    let enclosure_mime = item.enclosure.as_ref().and_then(|e| e.mime_type.as_deref());
    let media_type = classify_media(&MediaSignals {
        enclosure_mime,
        media_mimes: item
            .media_content
            .iter()
            .filter_map(|m| m.mime_type.as_deref())
            .collect(),
        media_mediums: item
            .media_content
            .iter()
            .filter_map(|m| m.medium.as_deref())
            .collect(),
        categories: &categories,
        content_html: &content_html,
    });

    let image_url = lead_image(item.enclosure.as_ref());

    FeedItem {
        title: text_of(item.title).unwrap_or_else(|| "Untitled".to_string()),
        url,
        published_at: text_of(item.pub_date)
            .as_deref()
            .and_then(parse_date)
            .unwrap_or(fetched_at),
        author,
        content_html,
        summary,
        media_type,
        image_url,
        guid,
        categories,
    }
}

/// An enclosure doubles as the lead image only when it is not itself the
/// audio/video payload.
fn lead_image(enclosure: Option<&MediaAttachment>) -> Option<String> {
    let enc = enclosure?;
    let mime = enc.mime_type.as_deref().unwrap_or_default();
    if mime.starts_with("audio/") || mime.starts_with("video/") {
        return None;
    }
    enc.url.clone()
}

// ============================================================================
// Atom
// ============================================================================

#[derive(Debug, Deserialize)]
struct AtomDocument {
    title: Option<TextValue>,
    subtitle: Option<TextValue>,
    updated: Option<TextValue>,
    author: Option<AtomAuthor>,
    #[serde(rename = "link", default)]
    links: Vec<RelLink>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct RelLink {
    #[serde(rename = "@rel")]
    rel: Option<String>,
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@type")]
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
    #[serde(rename = "$text")]
    text: Option<String>,
}

impl AtomCategory {
    fn into_text(self) -> Option<String> {
        self.term
            .or(self.text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<TextValue>,
    id: Option<TextValue>,
    published: Option<TextValue>,
    updated: Option<TextValue>,
    author: Option<AtomAuthor>,
    content: Option<TextValue>,
    summary: Option<TextValue>,
    #[serde(rename = "link", default)]
    links: Vec<RelLink>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
    #[serde(rename = "media:content", default)]
    media_content: Vec<MediaAttachment>,
}

fn parse_atom(
    raw_xml: &str,
    requested_url: &str,
    fetched_at: DateTime<Utc>,
) -> Result<Feed, ParseError> {
    let doc: AtomDocument =
        quick_xml::de::from_str(raw_xml).map_err(|e| ParseError::Xml(e.to_string()))?;

    let feed_title = text_of(doc.title).unwrap_or_else(|| "Untitled".to_string());
    let feed_author = doc.author.and_then(|a| text_of(a.name));
    let feed_url = find_link(&doc.links, Some("self"))
        .unwrap_or_else(|| requested_url.to_string());
    let site_url = alternate_link(&doc.links);

    let items = doc
        .entries
        .into_iter()
        .map(|entry| atom_entry(entry, &feed_title, feed_author.as_deref(), fetched_at))
        .collect();

    Ok(Feed {
        title: feed_title,
        description: text_of(doc.subtitle),
        site_url,
        feed_url,
        author: feed_author,
        last_build: text_of(doc.updated).as_deref().and_then(parse_date),
        items,
    })
}

fn atom_entry(
    entry: AtomEntry,
    feed_title: &str,
    feed_author: Option<&str>,
    fetched_at: DateTime<Utc>,
) -> FeedItem {
    let content = text_of(entry.content);
    let summary_text = text_of(entry.summary);

    // Full content wins; a differing summary is kept alongside it
    let (content_html, summary) = match (content, summary_text) {
        (Some(content), Some(summary)) if summary != content => (content, Some(summary)),
        (Some(content), _) => (content, None),
        (None, summary) => (summary.unwrap_or_default(), None),
    };

    let url = alternate_link(&entry.links).unwrap_or_default();
    let enclosure = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("enclosure"));

    let author = entry
        .author
        .and_then(|a| text_of(a.name))
        .or_else(|| feed_author.map(str::to_string))
        .unwrap_or_else(|| feed_title.to_string());

    let categories: Vec<String> = entry
        .categories
        .into_iter()
        .filter_map(AtomCategory::into_text)
        .collect();

    let media_type = classify_media(&MediaSignals {
        enclosure_mime: enclosure.and_then(|l| l.mime_type.as_deref()),
        media_mimes: entry
            .media_content
            .iter()
            .filter_map(|m| m.mime_type.as_deref())
            .collect(),
        media_mediums: entry
            .media_content
            .iter()
            .filter_map(|m| m.medium.as_deref())
            .collect(),
        categories: &categories,
        content_html: &content_html,
    });

    let image_url = enclosure.and_then(|l| {
        let mime = l.mime_type.as_deref().unwrap_or_default();
        if mime.starts_with("audio/") || mime.starts_with("video/") {
            None
        } else {
            l.href.clone()
        }
    });

    FeedItem {
        title: text_of(entry.title).unwrap_or_else(|| "Untitled".to_string()),
        url,
        published_at: text_of(entry.published)
            .or_else(|| text_of(entry.updated))
            .as_deref()
            .and_then(parse_date)
            .unwrap_or(fetched_at),
        author,
        content_html,
        summary,
        media_type,
        image_url,
        guid: text_of(entry.id),
        categories,
    }
}

/// The canonical entry URL: `rel="alternate"`, or a link with no `rel` at all.
fn alternate_link(links: &[RelLink]) -> Option<String> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .and_then(|l| l.href.clone())
}

fn find_link(links: &[RelLink], rel: Option<&str>) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref() == rel)
        .and_then(|l| l.href.clone())
}

// ============================================================================
// Date handling
// ============================================================================

/// Parse a feed timestamp: RFC 2822 (RSS), RFC 3339 (Atom), then a couple of
/// bare formats seen in the wild. `None` means "use fetch time".
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    None
}
