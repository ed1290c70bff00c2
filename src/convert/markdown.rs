//! HTML to Markdown conversion
//!
//! Renders a feed item's HTML body as clean Markdown by walking the parsed
//! DOM. Newsletter-specific cleanup happens during the walk: empty
//! paragraphs vanish, subscription/CTA widgets are deleted entirely, image
//! captions come out as italic text, and fenced code blocks keep the
//! language hint from a `language-*` class on the inner code element.

use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;

static MULTI_NEWLINE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Class fragments marking subscription prompts and other call-to-action
/// widgets that have no place in an archived article
const NOISE_CLASS_FRAGMENTS: &[&str] = &[
    "subscription-widget",
    "subscribe-widget",
    "subscribe-prompt",
    "button-wrapper",
    "paywall",
    "install-substack-app",
];

/// Convert an HTML body to Markdown
pub fn html_to_markdown(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    render_children(fragment.root_element(), &mut out, 0);

    let collapsed = MULTI_NEWLINE_REGEX.replace_all(&out, "\n\n");
    collapsed.trim().to_string()
}

/// Whitespace-tokenized word count of the HTML with tags stripped and
/// entities decoded
pub fn word_count(html: &str) -> usize {
    let stripped = TAG_REGEX.replace_all(html, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    decoded.split_whitespace().count()
}

/// Estimated read time in minutes at 200 words per minute, rounded up
pub fn read_time(words: usize) -> usize {
    words.div_ceil(200)
}

// ============================================================================
// DOM walk
// ============================================================================

fn render_children(el: ElementRef<'_>, out: &mut String, list_depth: usize) {
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            render_element(child_el, out, list_depth);
        } else if let Some(text) = child.value().as_text() {
            push_inline_text(out, text);
        }
    }
}

fn render_element(el: ElementRef<'_>, out: &mut String, list_depth: usize) {
    if is_noise_widget(el) {
        return;
    }

    let tag = el.value().name();
    match tag {
        "script" | "style" | "head" | "iframe" | "form" | "button" => {}

        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag.as_bytes()[1] - b'0';
            let text = inline_text(el);
            if !text.is_empty() {
                push_block(out, &format!("{} {}", "#".repeat(level as usize), text));
            }
        }

        "p" => {
            let mut buf = String::new();
            render_children(el, &mut buf, list_depth);
            // empty paragraphs are stripped outright
            if !buf.trim().is_empty() {
                push_block(out, buf.trim());
            }
        }

        "br" => out.push('\n'),

        "hr" => push_block(out, "---"),

        "em" | "i" => wrap_inline(el, out, "*", list_depth),

        "strong" | "b" => wrap_inline(el, out, "**", list_depth),

        "a" => {
            let href = el.value().attr("href").unwrap_or_default().trim();
            let mut text = String::new();
            render_children(el, &mut text, list_depth);
            let text = text.trim();
            if href.is_empty() {
                out.push_str(text);
            } else if text.is_empty() {
                out.push_str(&format!("[{href}]({href})"));
            } else {
                out.push_str(&format!("[{text}]({href})"));
            }
        }

        "img" => {
            let src = el.value().attr("src").unwrap_or_default();
            if !src.is_empty() {
                let alt = el.value().attr("alt").unwrap_or_default();
                push_block(out, &format!("![{alt}]({src})"));
            }
        }

        "figure" => render_children(el, out, list_depth),

        "figcaption" => {
            let text = inline_text(el);
            if !text.is_empty() {
                push_block(out, &format!("*{text}*"));
            }
        }

        "blockquote" => {
            let mut buf = String::new();
            render_children(el, &mut buf, list_depth);
            let quoted: String = buf
                .trim()
                .lines()
                .map(|line| format!("> {}", line.trim()))
                .collect::<Vec<_>>()
                .join("\n");
            if !quoted.is_empty() {
                push_block(out, &quoted);
            }
        }

        "ul" | "ol" => {
            let ordered = tag == "ol";
            if list_depth == 0 {
                ensure_block_break(out);
            }
            let mut index = 1;
            for child in el.children() {
                if let Some(li) = ElementRef::wrap(child) {
                    if li.value().name() != "li" {
                        continue;
                    }
                    let mut buf = String::new();
                    render_children(li, &mut buf, list_depth + 1);
                    let marker = if ordered {
                        format!("{index}. ")
                    } else {
                        "- ".to_string()
                    };
                    out.push_str(&"  ".repeat(list_depth));
                    out.push_str(&marker);
                    out.push_str(buf.trim());
                    out.push('\n');
                    index += 1;
                }
            }
            if list_depth == 0 {
                out.push('\n');
            }
        }

        "pre" => {
            let (code, language) = code_block_of(el);
            push_block(out, &format!("```{language}\n{}\n```", code.trim_end()));
        }

        "code" => {
            let text = el.text().collect::<String>();
            out.push_str(&format!("`{}`", text.trim()));
        }

        // divs, spans, sections, articles and anything unrecognized are
        // transparent containers
        _ => render_children(el, out, list_depth),
    }
}

/// Extract a `<pre>` block's code text and the language hint from a
/// `language-*` class on the inner code element
fn code_block_of(pre: ElementRef<'_>) -> (String, String) {
    for child in pre.children() {
        if let Some(code) = ElementRef::wrap(child) {
            if code.value().name() == "code" {
                let language = code
                    .value()
                    .attr("class")
                    .unwrap_or_default()
                    .split_whitespace()
                    .find_map(|class| class.strip_prefix("language-"))
                    .unwrap_or_default()
                    .to_string();
                return (code.text().collect(), language);
            }
        }
    }
    (pre.text().collect(), String::new())
}

fn is_noise_widget(el: ElementRef<'_>) -> bool {
    let Some(class) = el.value().attr("class") else {
        return false;
    };
    NOISE_CLASS_FRAGMENTS
        .iter()
        .any(|fragment| class.contains(fragment))
}

/// Flattened, whitespace-normalized text content of an element
fn inline_text(el: ElementRef<'_>) -> String {
    let text: String = el.text().collect();
    WHITESPACE_REGEX.replace_all(text.trim(), " ").into_owned()
}

fn push_inline_text(out: &mut String, text: &str) {
    let normalized = WHITESPACE_REGEX.replace_all(text, " ");
    if normalized.trim().is_empty() {
        return;
    }
    // avoid gluing words together across tag boundaries
    if !out.is_empty() && !out.ends_with(char::is_whitespace) && normalized.starts_with(' ') {
        out.push(' ');
    }
    out.push_str(normalized.trim_start_matches(' '));
    if normalized.ends_with(' ') {
        out.push(' ');
    }
}

fn wrap_inline(el: ElementRef<'_>, out: &mut String, marker: &str, list_depth: usize) {
    let mut buf = String::new();
    render_children(el, &mut buf, list_depth);
    let buf = buf.trim();
    if !buf.is_empty() {
        out.push_str(&format!("{marker}{buf}{marker}"));
    }
}

fn ensure_block_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with("\n\n") {
        while out.ends_with('\n') {
            out.pop();
        }
        out.push_str("\n\n");
    }
}

fn push_block(out: &mut String, block: &str) {
    ensure_block_break(out);
    out.push_str(block);
    out.push_str("\n\n");
}
