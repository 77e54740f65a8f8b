//! Page geometry and anchor resolution.
//!
//! Context extraction needs two things a static HTML page cannot answer by
//! itself: where an element sits vertically, and which element a selection
//! belongs to when the caller could not say. Both live behind traits so a
//! real layout engine can be plugged in, and tests can pin geometry down
//! exactly.
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`FlowLayout`] | Estimates geometry from document-order text volume |
//! | [`FixedLayout`] | Explicit rects keyed by element `id` |
//! | [`ViewportCenter`] | Element under the viewport center (heuristic fallback) |
//! | [`SelectorAnchor`] | First element matching a CSS selector |
//! | [`ContainingText`] | Innermost element whose text contains the selection |
//! | [`Chain`] | First resolver that yields an element |

use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::models::Rect;

/// Source of element geometry.
pub trait Layout {
    /// Bounding box of `element`, or `None` if it has no known geometry.
    fn rect(&self, page: &Html, element: ElementRef<'_>) -> Option<Rect>;
}

/// Picks the element a selection is anchored to.
pub trait AnchorResolver {
    fn resolve<'a>(&self, page: &'a Html, selected: &str) -> Option<ElementRef<'a>>;
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-collapsed text content of an element.
pub fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// The `<body>` element, or the document root for fragments without one.
fn content_root(page: &Html) -> ElementRef<'_> {
    Selector::parse("body")
        .ok()
        .and_then(|sel| page.select(&sel).next())
        .unwrap_or_else(|| page.root_element())
}

// ============ FlowLayout ============

/// Layout estimated from text volume.
///
/// Every non-blank text node is laid out as its own block of
/// `ceil(chars / chars_per_line)` lines, stacked in document order. An
/// element spans the blocks of the text nodes it contains. Elements with
/// no text have no geometry.
#[derive(Debug, Clone)]
pub struct FlowLayout {
    pub chars_per_line: usize,
    pub line_height: f64,
    pub width: f64,
}

impl FlowLayout {
    pub fn from_config(config: &LayoutConfig) -> Self {
        Self {
            chars_per_line: config.chars_per_line.max(1),
            line_height: config.line_height,
            width: config.viewport_width,
        }
    }

    fn block_height(&self, text: &str) -> f64 {
        let chars = text.trim().chars().count();
        if chars == 0 {
            return 0.0;
        }
        let lines = chars.div_ceil(self.chars_per_line.max(1));
        lines as f64 * self.line_height
    }
}

impl Layout for FlowLayout {
    fn rect(&self, page: &Html, element: ElementRef<'_>) -> Option<Rect> {
        let target = element.id();
        let mut top = 0.0;
        let mut found = false;

        for node in page.root_element().descendants() {
            if node.id() == target {
                found = true;
                break;
            }
            if let Some(text) = node.value().as_text() {
                top += self.block_height(text);
            }
        }
        if !found {
            return None;
        }

        let height: f64 = element
            .descendants()
            .filter_map(|n| n.value().as_text().map(|t| self.block_height(t)))
            .sum();
        if height == 0.0 {
            return None;
        }

        Some(Rect::new(0.0, top, self.width, height))
    }
}

// ============ FixedLayout ============

/// Explicit geometry keyed by the element's `id` attribute.
#[derive(Debug, Clone, Default)]
pub struct FixedLayout {
    rects: HashMap<String, Rect>,
}

impl FixedLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, rect: Rect) -> Self {
        self.rects.insert(id.into(), rect);
        self
    }
}

impl Layout for FixedLayout {
    fn rect(&self, _page: &Html, element: ElementRef<'_>) -> Option<Rect> {
        element
            .value()
            .attr("id")
            .and_then(|id| self.rects.get(id))
            .copied()
    }
}

// ============ Resolvers ============

/// The innermost element under the center of the viewport.
///
/// Inherently approximate: a selection spanning several elements has no
/// single anchor, and the answer depends on scroll position.
#[derive(Debug, Clone)]
pub struct ViewportCenter<L> {
    pub layout: L,
    pub scroll_top: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl<L: Layout> ViewportCenter<L> {
    pub fn new(layout: L, config: &LayoutConfig) -> Self {
        Self {
            layout,
            scroll_top: 0.0,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
        }
    }

    pub fn scrolled_to(mut self, scroll_top: f64) -> Self {
        self.scroll_top = scroll_top;
        self
    }
}

impl<L: Layout> AnchorResolver for ViewportCenter<L> {
    fn resolve<'a>(&self, page: &'a Html, _selected: &str) -> Option<ElementRef<'a>> {
        let x = self.viewport_width / 2.0;
        let y = self.scroll_top + self.viewport_height / 2.0;

        // Descendants come in document order, so the last hit is the innermost.
        content_root(page)
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| {
                self.layout
                    .rect(page, *el)
                    .is_some_and(|r| r.contains(x, y))
            })
            .last()
    }
}

/// First element matching a CSS selector.
#[derive(Debug, Clone)]
pub struct SelectorAnchor(pub String);

impl AnchorResolver for SelectorAnchor {
    fn resolve<'a>(&self, page: &'a Html, _selected: &str) -> Option<ElementRef<'a>> {
        let selector = match Selector::parse(&self.0) {
            Ok(s) => s,
            Err(_) => {
                tracing::debug!(selector = %self.0, "anchor selector does not parse");
                return None;
            }
        };
        page.select(&selector).next()
    }
}

/// The first element, in document order, whose text contains the
/// selection while none of its child elements does.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainingText;

impl AnchorResolver for ContainingText {
    fn resolve<'a>(&self, page: &'a Html, selected: &str) -> Option<ElementRef<'a>> {
        let needle = collapse_whitespace(selected);
        if needle.is_empty() {
            return None;
        }

        content_root(page)
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| {
                element_text(*el).contains(&needle)
                    && !el
                        .children()
                        .filter_map(ElementRef::wrap)
                        .any(|child| element_text(child).contains(&needle))
            })
    }
}

/// Tries each resolver in turn.
#[derive(Default)]
pub struct Chain(pub Vec<Box<dyn AnchorResolver>>);

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, resolver: impl AnchorResolver + 'static) -> Self {
        self.0.push(Box::new(resolver));
        self
    }
}

impl AnchorResolver for Chain {
    fn resolve<'a>(&self, page: &'a Html, selected: &str) -> Option<ElementRef<'a>> {
        self.0.iter().find_map(|r| r.resolve(page, selected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow() -> FlowLayout {
        FlowLayout {
            chars_per_line: 10,
            line_height: 20.0,
            width: 800.0,
        }
    }

    fn id_of(el: Option<ElementRef<'_>>) -> Option<&str> {
        el.and_then(|e| e.value().attr("id"))
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b   c "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_flow_layout_stacks_text_blocks() {
        let page = Html::parse_document(
            r#"<body><p id="a">0123456789ab</p><p id="b">xyz</p><div id="empty"></div></body>"#,
        );
        let layout = flow();
        let sel = |id: &str| {
            let s = Selector::parse(&format!("#{}", id)).unwrap();
            page.select(&s).next().unwrap()
        };

        // 12 chars at 10 per line -> 2 lines
        let a = layout.rect(&page, sel("a")).unwrap();
        assert_eq!(a.top(), 0.0);
        assert_eq!(a.height, 40.0);

        let b = layout.rect(&page, sel("b")).unwrap();
        assert_eq!(b.top(), 40.0);
        assert_eq!(b.height, 20.0);

        assert!(layout.rect(&page, sel("empty")).is_none());
    }

    #[test]
    fn test_viewport_center_picks_innermost() {
        let page = Html::parse_document(
            r#"<body><section id="s"><p id="p1">first</p><p id="p2">second</p></section></body>"#,
        );
        let layout = FixedLayout::new()
            .with("s", Rect::new(0.0, 0.0, 1000.0, 1000.0))
            .with("p1", Rect::new(0.0, 0.0, 1000.0, 300.0))
            .with("p2", Rect::new(0.0, 300.0, 1000.0, 300.0));
        let resolver = ViewportCenter {
            layout,
            scroll_top: 0.0,
            viewport_width: 1000.0,
            viewport_height: 800.0,
        };
        assert_eq!(id_of(resolver.resolve(&page, "")), Some("p2"));

        let resolver = resolver.scrolled_to(-300.0);
        assert_eq!(id_of(resolver.resolve(&page, "")), Some("p1"));
    }

    #[test]
    fn test_containing_text_prefers_leaf() {
        let page = Html::parse_document(
            r#"<body><div id="d"><p id="p1">alpha beta</p><p id="p2">gamma   delta</p></div></body>"#,
        );
        assert_eq!(id_of(ContainingText.resolve(&page, "gamma delta")), Some("p2"));
        // Spans two paragraphs: only the container holds it.
        assert_eq!(id_of(ContainingText.resolve(&page, "betagamma")), Some("d"));
        assert!(ContainingText.resolve(&page, "missing").is_none());
        assert!(ContainingText.resolve(&page, "  ").is_none());
    }

    #[test]
    fn test_selector_anchor_and_chain() {
        let page = Html::parse_document(r#"<body><p id="x">text</p></body>"#);
        assert_eq!(id_of(SelectorAnchor("#x".into()).resolve(&page, "")), Some("x"));
        assert!(SelectorAnchor("p[".into()).resolve(&page, "").is_none());

        let chain = Chain::new()
            .then(SelectorAnchor("#nope".into()))
            .then(ContainingText);
        assert_eq!(id_of(chain.resolve(&page, "text")), Some("x"));
    }
}
