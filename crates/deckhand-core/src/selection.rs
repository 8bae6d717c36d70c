//! Active slide / active element tracking
//!
//! The selection only ever names entities present in the current tree.
//! Whenever the tree changes the store re-derives it through the helpers
//! here, so a deleted slide or element is never left selected.

use serde::Serialize;

use crate::model::{ElementId, Presentation, Slide, SlideId};

/// Pick the slide index to activate after removing the active slide
///
/// The slide that moved into the vacated position wins; when the tail was
/// removed the new last slide is chosen. `None` once no slides remain.
pub fn tie_break_index(removed_index: usize, new_len: usize) -> Option<usize> {
    if new_len == 0 {
        None
    } else {
        Some(removed_index.min(new_len - 1))
    }
}

/// Current editing focus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    active_slide: Option<SlideId>,
    active_element: Option<ElementId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_slide(&self) -> Option<&SlideId> {
        self.active_slide.as_ref()
    }

    pub fn active_element(&self) -> Option<&ElementId> {
        self.active_element.as_ref()
    }

    /// Focus a slide
    ///
    /// Element focus is cleared whenever the active slide changes, even if an
    /// element with the same id exists on the new slide. Returns whether the
    /// active slide changed.
    pub fn select_slide(&mut self, id: Option<SlideId>) -> bool {
        if self.active_slide == id {
            return false;
        }
        self.active_slide = id;
        self.active_element = None;
        true
    }

    /// Focus an element of the active slide (membership is checked by the store)
    ///
    /// Returns whether element focus changed.
    pub fn select_element(&mut self, id: Option<ElementId>) -> bool {
        if self.active_element == id {
            return false;
        }
        self.active_element = id;
        true
    }

    /// Re-derive focus after `removed` (formerly at `removed_index`) left the sequence
    pub fn slide_removed(&mut self, removed: &SlideId, removed_index: usize, remaining: &[Slide]) {
        if self.active_slide.as_ref() != Some(removed) {
            return;
        }
        let next = tie_break_index(removed_index, remaining.len()).map(|i| remaining[i].id.clone());
        self.select_slide(next);
    }

    /// Clear element focus if `removed` on `slide` was the focused element
    ///
    /// Element ids are only unique within a slide, so the slide must match too.
    pub fn element_removed(&mut self, slide: &SlideId, removed: &ElementId) {
        if self.active_slide.as_ref() == Some(slide) && self.active_element.as_ref() == Some(removed)
        {
            self.active_element = None;
        }
    }

    /// Follow a slide whose temporary id was swapped for the server's
    pub fn slide_replaced(&mut self, old: &SlideId, new: &SlideId) {
        if self.active_slide.as_ref() == Some(old) {
            self.active_slide = Some(new.clone());
        }
    }

    /// Follow an element whose temporary id was swapped for the server's
    pub fn element_replaced(&mut self, old: &ElementId, new: &ElementId) {
        if self.active_element.as_ref() == Some(old) {
            self.active_element = Some(new.clone());
        }
    }

    /// Drop references to entities missing from `presentation`
    ///
    /// A dangling slide falls back to the first slide; a dangling element
    /// (or one that is not on the active slide) is cleared.
    pub fn reconcile(&mut self, presentation: Option<&Presentation>) {
        let Some(presentation) = presentation else {
            self.active_slide = None;
            self.active_element = None;
            return;
        };

        if let Some(ref id) = self.active_slide {
            if presentation.slide(id).is_none() {
                let first = presentation.slides.first().map(|s| s.id.clone());
                self.select_slide(first);
            }
        }

        let element_ok = match (&self.active_slide, &self.active_element) {
            (Some(slide_id), Some(element_id)) => presentation
                .slide(slide_id)
                .is_some_and(|s| s.element(element_id).is_some()),
            (None, Some(_)) => false,
            (_, None) => true,
        };
        if !element_ok {
            self.active_element = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewElement, PresentationId};

    fn slides(ids: &[&str]) -> Vec<Slide> {
        ids.iter().map(|id| Slide::new(SlideId::new(*id))).collect()
    }

    #[test]
    fn test_tie_break_index() {
        // Middle deletion: the next slide slides into place
        assert_eq!(tie_break_index(2, 3), Some(2));
        // Tail deletion: new last slide
        assert_eq!(tie_break_index(2, 2), Some(1));
        assert_eq!(tie_break_index(0, 1), Some(0));
        assert_eq!(tie_break_index(0, 0), None);
    }

    #[test]
    fn test_tie_break_exhaustive() {
        for len in 1..8usize {
            for i in 0..len {
                let new_len = len - 1;
                let expected = if new_len == 0 {
                    None
                } else {
                    Some(i.min(new_len - 1))
                };
                assert_eq!(tie_break_index(i, new_len), expected);
            }
        }
    }

    #[test]
    fn test_select_slide_clears_element() {
        let mut sel = Selection::new();
        sel.select_slide(Some(SlideId::new("a")));
        sel.select_element(Some(ElementId::new("shared")));

        assert!(sel.select_slide(Some(SlideId::new("b"))));
        assert!(sel.active_element().is_none());
    }

    #[test]
    fn test_reselect_same_slide_keeps_element() {
        let mut sel = Selection::new();
        sel.select_slide(Some(SlideId::new("a")));
        sel.select_element(Some(ElementId::new("e")));

        assert!(!sel.select_slide(Some(SlideId::new("a"))));
        assert_eq!(sel.active_element(), Some(&ElementId::new("e")));
    }

    #[test]
    fn test_slide_removed_picks_neighbour() {
        let mut sel = Selection::new();
        sel.select_slide(Some(SlideId::new("c")));

        // [a, b, c, d] minus c (index 2)
        sel.slide_removed(&SlideId::new("c"), 2, &slides(&["a", "b", "d"]));
        assert_eq!(sel.active_slide(), Some(&SlideId::new("d")));
    }

    #[test]
    fn test_slide_removed_inactive_is_ignored() {
        let mut sel = Selection::new();
        sel.select_slide(Some(SlideId::new("a")));
        sel.select_element(Some(ElementId::new("e")));

        sel.slide_removed(&SlideId::new("b"), 1, &slides(&["a", "c"]));
        assert_eq!(sel.active_slide(), Some(&SlideId::new("a")));
        assert_eq!(sel.active_element(), Some(&ElementId::new("e")));
    }

    #[test]
    fn test_element_removed() {
        let mut sel = Selection::new();
        sel.select_slide(Some(SlideId::new("a")));
        sel.select_element(Some(ElementId::new("e1")));

        sel.element_removed(&SlideId::new("a"), &ElementId::new("e2"));
        assert_eq!(sel.active_element(), Some(&ElementId::new("e1")));

        sel.element_removed(&SlideId::new("a"), &ElementId::new("e1"));
        assert!(sel.active_element().is_none());
    }

    #[test]
    fn test_element_removed_from_other_slide_keeps_focus() {
        let mut sel = Selection::new();
        sel.select_slide(Some(SlideId::new("a")));
        sel.select_element(Some(ElementId::new("x")));

        sel.element_removed(&SlideId::new("b"), &ElementId::new("x"));
        assert_eq!(sel.active_element(), Some(&ElementId::new("x")));
    }

    #[test]
    fn test_select_element_reports_change() {
        let mut sel = Selection::new();
        sel.select_slide(Some(SlideId::new("a")));

        assert!(sel.select_element(Some(ElementId::new("e"))));
        assert!(!sel.select_element(Some(ElementId::new("e"))));
        assert!(sel.select_element(None));
        assert!(!sel.select_element(None));
    }

    #[test]
    fn test_reconcile_drops_dangling_refs() {
        let mut p = Presentation::new(PresentationId::new("p"), "Deck");
        p.slides = slides(&["a", "b"]);
        p.slides[1]
            .elements
            .push(NewElement::text("x").build(ElementId::new("e")).unwrap());

        let mut sel = Selection::new();
        sel.select_slide(Some(SlideId::new("gone")));
        sel.reconcile(Some(&p));
        assert_eq!(sel.active_slide(), Some(&SlideId::new("a")));

        // Element exists, but on another slide
        sel.select_element(Some(ElementId::new("e")));
        sel.reconcile(Some(&p));
        assert!(sel.active_element().is_none());

        sel.reconcile(None);
        assert_eq!(sel, Selection::new());
    }
}
