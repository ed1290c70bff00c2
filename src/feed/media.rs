//! Media type detection for feed items
//!
//! Precedence is deliberate: explicit machine-readable signals (enclosure
//! MIME, Media-RSS) outrank category labels, which outrank raw-HTML text
//! scanning. The text scan only exists for feeds that omit all structured
//! media metadata, a common failure mode in the wild.

use crate::models::MediaType;

/// Everything the classifier looks at for one item, in precedence order
#[derive(Debug, Default)]
pub(crate) struct MediaSignals<'a> {
    /// MIME type of the item's enclosure (RSS) or enclosure link (Atom)
    pub enclosure_mime: Option<&'a str>,
    /// `media:content` type attributes
    pub media_mimes: Vec<&'a str>,
    /// `media:content` medium attributes
    pub media_mediums: Vec<&'a str>,
    pub categories: &'a [String],
    pub content_html: &'a str,
}

/// Classify an item, evaluating each signal in order until one matches
pub(crate) fn classify_media(signals: &MediaSignals<'_>) -> MediaType {
    if let Some(kind) = from_mime(signals.enclosure_mime.unwrap_or_default()) {
        return kind;
    }

    for mime in &signals.media_mimes {
        if let Some(kind) = from_mime(mime) {
            return kind;
        }
    }

    for medium in &signals.media_mediums {
        match medium.to_ascii_lowercase().as_str() {
            "audio" => return MediaType::Audio,
            "video" => return MediaType::Video,
            _ => {}
        }
    }

    for category in signals.categories {
        let category = category.to_lowercase();
        if category.contains("video") {
            return MediaType::Video;
        }
        if category.contains("podcast") || category.contains("audio") {
            return MediaType::Audio;
        }
    }

    from_html(signals.content_html).unwrap_or(MediaType::Text)
}

fn from_mime(mime: &str) -> Option<MediaType> {
    if mime.starts_with("audio/") {
        Some(MediaType::Audio)
    } else if mime.starts_with("video/") {
        Some(MediaType::Video)
    } else {
        None
    }
}

/// Last-resort heuristic over the raw HTML body
fn from_html(html: &str) -> Option<MediaType> {
    let html = html.to_lowercase();
    if html.contains("<video") {
        return Some(MediaType::Video);
    }
    if html.contains("<audio")
        || html.contains("transcript")
        || html.contains("listen to this episode")
    {
        return Some(MediaType::Audio);
    }
    None
}

/// True when the raw HTML alone suggests audio/video content.
///
/// The pipeline uses this as a backstop in addition to [`classify_media`],
/// for feeds whose structured metadata under-reports media content.
pub fn html_suggests_media(html: &str) -> bool {
    let html = html.to_lowercase();
    html.contains("<video") || html.contains("<audio") || html.contains("transcript")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_signals(html: &str) -> MediaSignals<'_> {
        MediaSignals {
            content_html: html,
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_text_falls_through() {
        let signals = text_signals("<p>Just words.</p>");
        assert_eq!(classify_media(&signals), MediaType::Text);
    }

    #[test]
    fn test_enclosure_mime_wins() {
        let signals = MediaSignals {
            enclosure_mime: Some("audio/mpeg"),
            content_html: "<p>No media markers here.</p>",
            ..Default::default()
        };
        assert_eq!(classify_media(&signals), MediaType::Audio);

        let signals = MediaSignals {
            enclosure_mime: Some("video/mp4"),
            ..Default::default()
        };
        assert_eq!(classify_media(&signals), MediaType::Video);
    }

    #[test]
    fn test_structured_signal_beats_text_heuristic() {
        // Enclosure says video; body text screams podcast. Structured wins.
        let signals = MediaSignals {
            enclosure_mime: Some("video/mp4"),
            content_html: "<p>Listen to this episode of our podcast!</p>",
            ..Default::default()
        };
        assert_eq!(classify_media(&signals), MediaType::Video);
    }

    #[test]
    fn test_media_rss_mime_and_medium() {
        let signals = MediaSignals {
            media_mimes: vec!["video/webm"],
            ..Default::default()
        };
        assert_eq!(classify_media(&signals), MediaType::Video);

        let signals = MediaSignals {
            media_mediums: vec!["audio"],
            ..Default::default()
        };
        assert_eq!(classify_media(&signals), MediaType::Audio);
    }

    #[test]
    fn test_category_keywords() {
        let categories = vec!["Weekly Podcast".to_string()];
        let signals = MediaSignals {
            categories: &categories,
            ..Default::default()
        };
        assert_eq!(classify_media(&signals), MediaType::Audio);

        let categories = vec!["Video Essays".to_string()];
        let signals = MediaSignals {
            categories: &categories,
            ..Default::default()
        };
        assert_eq!(classify_media(&signals), MediaType::Video);
    }

    #[test]
    fn test_html_heuristics() {
        assert_eq!(
            classify_media(&text_signals("<video src=\"x.mp4\"></video>")),
            MediaType::Video
        );
        assert_eq!(
            classify_media(&text_signals("<audio src=\"x.mp3\"></audio>")),
            MediaType::Audio
        );
        assert_eq!(
            classify_media(&text_signals("<p>Full transcript below.</p>")),
            MediaType::Audio
        );
        assert_eq!(
            classify_media(&text_signals("<p>Listen to this episode.</p>")),
            MediaType::Audio
        );
    }

    #[test]
    fn test_html_suggests_media() {
        assert!(html_suggests_media("<audio src=\"e.mp3\">"));
        assert!(html_suggests_media("<VIDEO controls>"));
        assert!(html_suggests_media("<p>Read the transcript.</p>"));
        assert!(!html_suggests_media("<p>Plain prose.</p>"));
    }
}
