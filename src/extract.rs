//! Context extraction around a text selection.
//!
//! Given a page, the selected string and (ideally) the element the
//! selection sits in, recovers the structure a reader would see around it:
//! the governing section heading, a window of nearby text, the chapter
//! title and the page's source identifier.
//!
//! Extraction never fails. Every piece that cannot be found degrades to
//! `None`, and the surrounding text degrades to the selection itself.

use scraper::{ElementRef, Html, Selector};

use crate::config::ExtractionConfig;
use crate::layout::{collapse_whitespace, element_text, AnchorResolver, Layout};
use crate::models::ExtractedContext;

/// Headings that can title a section.
const SECTION_HEADINGS: &str = "h1, h2, h3, h4";

pub struct ContextExtractor<L> {
    config: ExtractionConfig,
    layout: L,
    heading_selector: Option<Selector>,
    chapter_selector: Option<Selector>,
    source_selector: Option<Selector>,
}

impl<L: Layout> ContextExtractor<L> {
    pub fn new(config: ExtractionConfig, layout: L) -> Self {
        let heading_selector = Selector::parse(SECTION_HEADINGS).ok();
        let chapter_selector = Selector::parse(&config.chapter_title_selector).ok();
        let source_selector = Selector::parse(&format!("[{}]", config.source_id_attribute)).ok();

        Self {
            config,
            layout,
            heading_selector,
            chapter_selector,
            source_selector,
        }
    }

    /// Extract the context of `selected`.
    ///
    /// `anchor` is the element containing the selection when the caller
    /// knows it; otherwise `fallback` is asked for one.
    pub fn extract<'a>(
        &self,
        page: &'a Html,
        selected: &str,
        anchor: Option<ElementRef<'a>>,
        fallback: &dyn AnchorResolver,
    ) -> ExtractedContext {
        let anchor = anchor.or_else(|| fallback.resolve(page, selected));
        if anchor.is_none() {
            tracing::debug!("no anchor element for selection; using page-level context only");
        }

        let section_title = anchor.and_then(|a| self.section_title(page, a));
        let surrounding_text = anchor
            .and_then(|a| self.surrounding_text(a, selected))
            .unwrap_or_else(|| selected.to_string());

        ExtractedContext {
            text: selected.to_string(),
            surrounding_text,
            section_title,
            chapter_title: self.chapter_title(page),
            source_id: self.source_id(page, anchor),
        }
    }

    /// Closest `h1`–`h4` containing the anchor, else the nearest one laid
    /// out strictly above it and less than `heading_max_distance` away.
    fn section_title(&self, page: &Html, anchor: ElementRef<'_>) -> Option<String> {
        let enclosing = std::iter::once(anchor)
            .chain(anchor.ancestors().filter_map(ElementRef::wrap))
            .find(is_section_heading);
        if let Some(title) = enclosing.and_then(non_empty_text) {
            return Some(title);
        }

        let anchor_top = self.layout.rect(page, anchor)?.top();
        let headings = self.heading_selector.as_ref()?;

        let mut best: Option<(f64, ElementRef<'_>)> = None;
        for heading in page.select(headings) {
            let Some(rect) = self.layout.rect(page, heading) else {
                continue;
            };
            let distance = anchor_top - rect.top();
            if distance <= 0.0 || distance >= self.config.heading_max_distance {
                continue;
            }
            // Strict comparison keeps the earlier heading on equal distance.
            if best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, heading));
            }
        }

        best.and_then(|(_, heading)| non_empty_text(heading))
    }

    /// A window of text around the selection, taken from the first of the
    /// anchor and its ancestors whose truncated text contains it.
    fn surrounding_text(&self, anchor: ElementRef<'_>, selected: &str) -> Option<String> {
        let needle = collapse_whitespace(selected);
        if needle.is_empty() {
            return None;
        }

        std::iter::once(anchor)
            .chain(anchor.ancestors().filter_map(ElementRef::wrap))
            .take(self.config.max_ancestor_depth)
            .find_map(|el| {
                let text: String = element_text(el)
                    .chars()
                    .take(self.config.ancestor_text_limit)
                    .collect();
                text_window(&text, &needle, self.config.context_window)
            })
    }

    fn chapter_title(&self, page: &Html) -> Option<String> {
        let selector = self.chapter_selector.as_ref()?;
        page.select(selector).find_map(non_empty_text)
    }

    fn source_id(&self, page: &Html, anchor: Option<ElementRef<'_>>) -> Option<String> {
        let attr = self.config.source_id_attribute.as_str();
        let read = |el: ElementRef<'_>| {
            el.value()
                .attr(attr)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        if let Some(id) = anchor.and_then(read) {
            return Some(id);
        }
        let selector = self.source_selector.as_ref()?;
        page.select(selector).find_map(read)
    }
}

fn is_section_heading(el: &ElementRef<'_>) -> bool {
    matches!(el.value().name(), "h1" | "h2" | "h3" | "h4")
}

fn non_empty_text(el: ElementRef<'_>) -> Option<String> {
    let text = element_text(el);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Up to `radius` characters either side of the first occurrence of
/// `needle` in `text`, trimmed.
fn text_window(text: &str, needle: &str, radius: usize) -> Option<String> {
    let byte_idx = text.find(needle)?;
    let start = text[..byte_idx].chars().count();
    let len = needle.chars().count();

    let from = start.saturating_sub(radius);
    let to = start + len + radius;
    let window: String = text.chars().skip(from).take(to - from).collect();

    Some(window.trim().to_string())
}
