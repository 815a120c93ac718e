//! Read-only handle over a rendered page.
//!
//! The browser collaborator delivers a [`RenderedPage`] (absolute URL plus
//! outer HTML); [`PageDom`] wraps the parsed document and offers the
//! lookups the extractors need: CSS selection, text/attribute reads and
//! structural-marker search. Structural markers are HTML comment tokens
//! the source site leaves in front of data blocks; they survive layout
//! redesigns better than CSS classes do.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// One fetched page as handed over by the browser collaborator.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: Url,
    pub html: String,
}

/// Parsed DOM of one rendered page. Purely read-only; extraction never
/// mutates page state.
pub struct PageDom {
    document: Html,
    url: Url,
}

impl PageDom {
    pub fn parse(page: &RenderedPage) -> Self {
        Self::from_html(&page.html, page.url.clone())
    }

    pub fn from_html(html: &str, url: Url) -> Self {
        Self {
            document: Html::parse_document(html),
            url,
        }
    }

    /// Absolute URL the page was fetched from.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// First element matching the CSS pattern. An invalid pattern behaves
    /// like a miss.
    pub fn select_first(&self, css: &str) -> Option<ElementRef<'_>> {
        let selector = Selector::parse(css).ok()?;
        self.document.select(&selector).next()
    }

    /// All elements matching the CSS pattern, in document order.
    pub fn select_all(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(selector) => self.document.select(&selector).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Trimmed text of the first matching element; `None` when empty.
    pub fn first_text(&self, css: &str) -> Option<String> {
        self.select_first(css).map(|el| element_text(&el)).filter(|t| !t.is_empty())
    }

    /// Trimmed attribute value of the first matching element.
    pub fn first_attr(&self, css: &str, attr: &str) -> Option<String> {
        self.select_first(css)
            .and_then(|el| el.value().attr(attr).map(|v| v.trim().to_string()))
            .filter(|v| !v.is_empty())
    }

    /// First element following an HTML comment whose text contains the
    /// given marker token.
    pub fn marker_sibling(&self, token: &str) -> Option<ElementRef<'_>> {
        for node in self.document.tree.nodes() {
            if let Node::Comment(comment) = node.value() {
                if comment.contains(token) {
                    for sibling in node.next_siblings() {
                        if let Some(el) = ElementRef::wrap(sibling) {
                            return Some(el);
                        }
                    }
                }
            }
        }
        None
    }

    /// Resolve a possibly-relative href against the page URL. Anchors and
    /// script pseudo-links resolve to nothing.
    pub fn resolve_href(&self, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return None;
        }
        self.url.join(href).ok()
    }
}

/// Whitespace-collapsed text content of an element.
pub fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(|chunk| chunk.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trimmed text of the first descendant matching the CSS pattern.
pub fn first_text_in(el: &ElementRef<'_>, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    el.select(&selector)
        .next()
        .map(|found| element_text(&found))
        .filter(|t| !t.is_empty())
}

/// Trimmed attribute of the first descendant matching the CSS pattern.
pub fn first_attr_in(el: &ElementRef<'_>, css: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    el.select(&selector)
        .next()
        .and_then(|found| found.value().attr(attr).map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}
