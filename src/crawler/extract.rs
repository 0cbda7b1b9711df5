//! Readable text extraction from HTML

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Structural fallbacks tried in order when extracting an article body
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "div[class*='article-body']",
    "div[class*='entry-content']",
    "div[class*='post-content']",
    "div[class*='content']",
    "main",
];

/// Removes markup from an HTML fragment and collapses whitespace
///
/// Script and style contents are dropped; entities are decoded.
///
/// # Example
///
/// ```
/// use newsweep::crawler::strip_markup;
///
/// assert_eq!(strip_markup("<p>Fish &amp; <b>chips</b></p>\n<p>today</p>"), "Fish & chips today");
/// ```
pub fn strip_markup(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return collapse_whitespace(html);
    }

    let fragment = Html::parse_fragment(html);
    visible_text(fragment.root_element())
}

/// Extracts the body text of an article page
///
/// Returns the first non-empty match of the structural fallbacks, or `None`
/// when no container yields any text.
pub fn extract_content(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for pattern in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(pattern) else {
            continue;
        };
        for element in document.select(&selector) {
            let text = visible_text(element);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    None
}

/// Collapses every run of whitespace into a single space
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            matches!(
                ancestor.value(),
                Node::Element(e) if matches!(e.name(), "script" | "style" | "noscript")
            )
        });
        if !hidden {
            parts.push(text);
        }
    }

    collapse_whitespace(&parts.join(" "))
}
