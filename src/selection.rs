//! Selection observer.
//!
//! Tracks the reader's current text selection. The selection itself lives
//! in a [`SelectionSource`] (the browser in production, a fixed value in
//! the CLI and tests); the observer only reads it when a pointer or key is
//! released and keeps a trimmed copy plus the bounding box of the first
//! range.

use crate::models::{Rect, Selection};

/// Source of the live selection.
pub trait SelectionSource {
    /// Current selection, or `None` when nothing is selected.
    fn snapshot(&self) -> Option<Selection>;
    /// Empty the selection.
    fn remove_all_ranges(&mut self);
}

/// Document-level input events the observer listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    PointerUp,
    KeyUp,
    Other,
}

impl SelectionEvent {
    fn is_release(self) -> bool {
        matches!(self, SelectionEvent::PointerUp | SelectionEvent::KeyUp)
    }
}

#[derive(Debug, Default)]
pub struct SelectionObserver {
    text: String,
    rect: Option<Rect>,
    visible: bool,
}

impl SelectionObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle an input event. Returns `true` when the observer's state
    /// was refreshed from the source.
    pub fn on_event(&mut self, event: SelectionEvent, source: &dyn SelectionSource) -> bool {
        if !event.is_release() {
            return false;
        }

        match source.snapshot() {
            Some(selection) if !selection.text.trim().is_empty() => {
                self.text = selection.text.trim().to_string();
                self.rect = selection.rect;
                self.visible = true;
            }
            _ => self.reset(),
        }
        true
    }

    pub fn selected_text(&self) -> &str {
        &self.text
    }

    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Empty the source selection and hide.
    pub fn clear(&mut self, source: &mut dyn SelectionSource) {
        source.remove_all_ranges();
        self.reset();
    }

    fn reset(&mut self) {
        self.text.clear();
        self.rect = None;
        self.visible = false;
    }
}

/// A selection fixed up front, e.g. from a command-line argument.
#[derive(Debug, Clone, Default)]
pub struct StaticSelection {
    selection: Option<Selection>,
}

impl StaticSelection {
    pub fn new(selection: Selection) -> Self {
        Self {
            selection: Some(selection),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Selection::new(text))
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl SelectionSource for StaticSelection {
    fn snapshot(&self) -> Option<Selection> {
        self.selection.clone()
    }

    fn remove_all_ranges(&mut self) {
        self.selection = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RangeHandle;

    #[test]
    fn test_release_captures_trimmed_text_and_rect() {
        let rect = Rect::new(5.0, 120.0, 90.0, 18.0);
        let source = StaticSelection::new(Selection {
            text: "  torque control \n".into(),
            range: Some(RangeHandle(1)),
            rect: Some(rect),
        });
        let mut observer = SelectionObserver::new();

        assert!(observer.on_event(SelectionEvent::PointerUp, &source));
        assert!(observer.is_visible());
        assert_eq!(observer.selected_text(), "torque control");
        assert_eq!(observer.rect(), Some(rect));
    }

    #[test]
    fn test_whitespace_selection_hides() {
        let mut observer = SelectionObserver::new();
        observer.on_event(SelectionEvent::KeyUp, &StaticSelection::text("joint"));
        assert!(observer.is_visible());

        observer.on_event(SelectionEvent::KeyUp, &StaticSelection::text("   \t"));
        assert!(!observer.is_visible());
        assert_eq!(observer.selected_text(), "");
        assert_eq!(observer.rect(), None);
    }

    #[test]
    fn test_no_selection_hides() {
        let mut observer = SelectionObserver::new();
        observer.on_event(SelectionEvent::PointerUp, &StaticSelection::empty());
        assert!(!observer.is_visible());
    }

    #[test]
    fn test_other_events_are_ignored() {
        let mut observer = SelectionObserver::new();
        let refreshed = observer.on_event(SelectionEvent::Other, &StaticSelection::text("gait"));
        assert!(!refreshed);
        assert!(!observer.is_visible());
    }

    #[test]
    fn test_clear_empties_source() {
        let mut source = StaticSelection::text("inverse kinematics");
        let mut observer = SelectionObserver::new();
        observer.on_event(SelectionEvent::PointerUp, &source);

        observer.clear(&mut source);
        assert!(!observer.is_visible());
        assert!(source.snapshot().is_none());

        // A later release sees nothing selected.
        observer.on_event(SelectionEvent::PointerUp, &source);
        assert!(!observer.is_visible());
    }
}
