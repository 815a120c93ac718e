//! Ordered extraction strategies for single fields.
//!
//! Every scalar field on the site exists in at least three layout
//! variants (legacy table markup, compact Bootstrap cards, wide
//! detail-page cards). Instead of parallel code paths per era, each field
//! carries an ordered list of closed recipes; the resolver returns the
//! first non-empty result and never errors.

use crate::page::{element_text, PageDom};

/// A closed, explicit extraction recipe for one field.
#[derive(Debug, Clone, Copy)]
pub enum Strategy {
    /// Trimmed text of the first element matching a CSS pattern.
    CssText(&'static str),
    /// Attribute value of the first element matching a CSS pattern.
    CssAttr {
        css: &'static str,
        attr: &'static str,
    },
    /// Text of the first element following a structural marker comment.
    MarkerText(&'static str),
    /// Attribute of the first element following a structural marker
    /// comment.
    MarkerAttr {
        token: &'static str,
        attr: &'static str,
    },
}

impl Strategy {
    fn apply(&self, page: &PageDom) -> Option<String> {
        match self {
            Strategy::CssText(css) => page.first_text(css),
            Strategy::CssAttr { css, attr } => page.first_attr(css, attr),
            Strategy::MarkerText(token) => page
                .marker_sibling(token)
                .map(|el| element_text(&el))
                .filter(|t| !t.is_empty()),
            Strategy::MarkerAttr { token, attr } => page
                .marker_sibling(token)
                .and_then(|el| el.value().attr(attr).map(|v| v.trim().to_string()))
                .filter(|v| !v.is_empty()),
        }
    }
}

/// Try strategies strictly in order and return the first non-empty
/// trimmed result. A field with no surviving strategy is absent, never an
/// error.
pub fn resolve_field(page: &PageDom, strategies: &[Strategy]) -> Option<String> {
    strategies.iter().find_map(|strategy| strategy.apply(page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn dom(html: &str) -> PageDom {
        PageDom::from_html(html, Url::parse("https://www.avto.net/Ads/x.asp").unwrap())
    }

    #[test]
    fn first_non_empty_strategy_wins() {
        let page = dom("<span class='old'></span><span class='new'>Golf</span>");
        let value = resolve_field(
            &page,
            &[Strategy::CssText("span.old"), Strategy::CssText("span.new")],
        );
        assert_eq!(value, Some("Golf".to_string()));
    }

    #[test]
    fn order_is_strict() {
        let page = dom("<span class='a'>first</span><span class='b'>second</span>");
        let value = resolve_field(
            &page,
            &[Strategy::CssText("span.b"), Strategy::CssText("span.a")],
        );
        assert_eq!(value, Some("second".to_string()));
    }

    #[test]
    fn marker_strategy_reads_sibling() {
        let page = dom("<div><!-- NAZIV --><h1>Audi A4</h1></div>");
        let value = resolve_field(&page, &[Strategy::MarkerText("NAZIV")]);
        assert_eq!(value, Some("Audi A4".to_string()));
    }

    #[test]
    fn attribute_strategies() {
        let page = dom("<div><!-- FOTO --><img src=' a.jpg '></div><img class='t' src='b.jpg'>");
        assert_eq!(
            resolve_field(
                &page,
                &[Strategy::MarkerAttr { token: "FOTO", attr: "src" }]
            ),
            Some("a.jpg".to_string())
        );
        assert_eq!(
            resolve_field(&page, &[Strategy::CssAttr { css: "img.t", attr: "src" }]),
            Some("b.jpg".to_string())
        );
    }

    #[test]
    fn all_misses_yield_absent() {
        let page = dom("<div>nothing here</div>");
        let value = resolve_field(
            &page,
            &[
                Strategy::CssText("span.missing"),
                Strategy::MarkerText("NO_SUCH_MARKER"),
            ],
        );
        assert_eq!(value, None);
    }
}
