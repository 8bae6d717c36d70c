//! In-memory document store
//!
//! The `DocumentStore` owns the presentation tree and the selection. Every
//! mutation either fully replaces the affected subtree or leaves the tree
//! untouched, and returns the new tree.
//!
//! ## Copy-on-write
//!
//! The tree is held as `Arc<Presentation>` and mutated through
//! `Arc::make_mut`. A [`Snapshot`] is just another handle on the same `Arc`,
//! so the first mutation after taking one clones the tree and the snapshot
//! keeps its values.
//!
//! ## Observers
//!
//! ```ignore
//! let mut views = store.subscribe();
//! store.apply_slide_add(slide)?;
//! assert!(views.has_changed()?);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::debug;

use crate::model::{Element, ElementId, ElementPatch, Presentation, Slide, SlideId, SlidePatch};
use crate::selection::Selection;

/// A store shared between the UI and the sync engine
pub type SharedStore = Arc<Mutex<DocumentStore>>;

/// Errors raised by store mutations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No presentation is loaded")]
    NotLoaded,

    #[error("Slide not found: {0}")]
    SlideNotFound(SlideId),

    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),

    #[error("Invalid slide order: {0}")]
    InvalidOrder(String),
}

/// Frozen copy of the store used for rollback
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    presentation: Option<Arc<Presentation>>,
    selection: Selection,
}

impl Snapshot {
    pub fn presentation(&self) -> Option<&Presentation> {
        self.presentation.as_deref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }
}

/// What observers see after each change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentView {
    pub presentation: Option<Arc<Presentation>>,
    pub selection: Selection,
    /// Incremented on every published change
    pub revision: u64,
}

/// Owner of the presentation tree and selection
pub struct DocumentStore {
    presentation: Option<Arc<Presentation>>,
    selection: Selection,
    revision: u64,
    views: watch::Sender<DocumentView>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// Create an empty store (nothing loaded)
    pub fn new() -> Self {
        let (views, _) = watch::channel(DocumentView::default());
        Self {
            presentation: None,
            selection: Selection::new(),
            revision: 0,
            views,
        }
    }

    /// Wrap the store for sharing with a sync engine
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<DocumentView> {
        self.views.subscribe()
    }

    /// Current state as seen by observers
    pub fn view(&self) -> DocumentView {
        DocumentView {
            presentation: self.presentation.clone(),
            selection: self.selection.clone(),
            revision: self.revision,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_loaded(&self) -> bool {
        self.presentation.is_some()
    }

    pub fn presentation(&self) -> Option<&Presentation> {
        self.presentation.as_deref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn slide(&self, id: &SlideId) -> Option<&Slide> {
        self.presentation()?.slide(id)
    }

    pub fn element(&self, slide_id: &SlideId, element_id: &ElementId) -> Option<&Element> {
        self.slide(slide_id)?.element(element_id)
    }

    /// Locate an element without knowing its slide
    pub fn find_element(&self, id: &ElementId) -> Option<(&Slide, &Element)> {
        self.presentation()?.find_element(id)
    }

    /// The active slide, read from the current tree
    pub fn active_slide(&self) -> Option<&Slide> {
        self.slide(self.selection.active_slide()?)
    }

    pub fn active_element(&self) -> Option<&Element> {
        self.active_slide()?.element(self.selection.active_element()?)
    }

    // ==================== Loading ====================

    /// Replace the whole tree; the first slide (if any) becomes active
    pub fn load(&mut self, mut presentation: Presentation) -> Arc<Presentation> {
        presentation.renumber_slides();
        let first = presentation.slides.first().map(|s| s.id.clone());
        let tree = Arc::new(presentation);
        self.presentation = Some(Arc::clone(&tree));
        self.selection = Selection::new();
        self.selection.select_slide(first);
        self.publish();
        tree
    }

    /// Forget the loaded presentation
    pub fn clear(&mut self) {
        self.presentation = None;
        self.selection = Selection::new();
        self.publish();
    }

    // ==================== Slides ====================

    /// Append a slide and make it active
    pub fn apply_slide_add(&mut self, slide: Slide) -> Result<Arc<Presentation>, StoreError> {
        let id = slide.id.clone();
        let tree = self.tree_mut()?;
        tree.slides.push(slide);
        tree.renumber_slides();
        self.selection.select_slide(Some(id));
        self.commit()
    }

    /// Remove a slide, re-selecting a neighbour if it was active
    pub fn apply_slide_delete(&mut self, id: &SlideId) -> Result<Arc<Presentation>, StoreError> {
        let Some(index) = self.current()?.slide_index(id) else {
            return self.current_arc();
        };

        let tree = self.tree_mut()?;
        tree.slides.remove(index);
        tree.renumber_slides();
        if let Some(presentation) = self.presentation.as_deref() {
            self.selection.slide_removed(id, index, &presentation.slides);
        }
        self.commit()
    }

    /// Put slides in the given order; the active slide is kept by identity
    ///
    /// `order` must be a permutation of the current slide ids, otherwise the
    /// tree is left untouched.
    pub fn apply_slide_reorder(&mut self, order: &[SlideId]) -> Result<Arc<Presentation>, StoreError> {
        validate_order(self.current()?, order)?;

        let tree = self.tree_mut()?;
        let mut remaining = std::mem::take(&mut tree.slides);
        let mut reordered = Vec::with_capacity(remaining.len());
        for id in order {
            if let Some(pos) = remaining.iter().position(|s| &s.id == id) {
                reordered.push(remaining.swap_remove(pos));
            }
        }
        tree.slides = reordered;
        tree.renumber_slides();
        self.commit()
    }

    /// Merge slide-level fields; unknown ids are a no-op
    pub fn apply_slide_update(
        &mut self,
        id: &SlideId,
        patch: &SlidePatch,
    ) -> Result<Arc<Presentation>, StoreError> {
        if self.current()?.slide(id).is_none() {
            return self.current_arc();
        }
        if let Some(slide) = self.tree_mut()?.slide_mut(id) {
            patch.apply(slide);
        }
        self.commit()
    }

    // ==================== Elements ====================

    /// Append an element to a slide
    pub fn apply_element_add(
        &mut self,
        slide_id: &SlideId,
        element: Element,
    ) -> Result<Arc<Presentation>, StoreError> {
        if self.current()?.slide(slide_id).is_none() {
            return Err(StoreError::SlideNotFound(slide_id.clone()));
        }
        if let Some(slide) = self.tree_mut()?.slide_mut(slide_id) {
            slide.elements.push(element);
        }
        self.commit()
    }

    /// Merge a patch into an element; unknown ids are a no-op
    pub fn apply_element_update(
        &mut self,
        slide_id: &SlideId,
        element_id: &ElementId,
        patch: &ElementPatch,
    ) -> Result<Arc<Presentation>, StoreError> {
        if self.current()?.slide(slide_id).and_then(|s| s.element(element_id)).is_none() {
            return self.current_arc();
        }
        if let Some(element) = self
            .tree_mut()?
            .slide_mut(slide_id)
            .and_then(|s| s.element_mut(element_id))
        {
            element.apply_patch(patch);
        }
        self.commit()
    }

    /// Remove an element; clears element focus if it was active
    pub fn apply_element_delete(
        &mut self,
        slide_id: &SlideId,
        element_id: &ElementId,
    ) -> Result<Arc<Presentation>, StoreError> {
        let Some(index) = self
            .current()?
            .slide(slide_id)
            .and_then(|s| s.element_index(element_id))
        else {
            return self.current_arc();
        };

        if let Some(slide) = self.tree_mut()?.slide_mut(slide_id) {
            slide.elements.remove(index);
        }
        self.selection.element_removed(slide_id, element_id);
        self.commit()
    }

    // ==================== Presentation ====================

    /// Replace the title only
    pub fn rename(&mut self, title: impl Into<String>) -> Result<Arc<Presentation>, StoreError> {
        self.tree_mut()?.title = title.into();
        self.commit()
    }

    // ==================== Selection ====================

    /// Make a slide active (clears element focus when the slide changes)
    pub fn select_slide(&mut self, id: &SlideId) -> Result<(), StoreError> {
        if self.current()?.slide(id).is_none() {
            return Err(StoreError::SlideNotFound(id.clone()));
        }
        if self.selection.select_slide(Some(id.clone())) {
            self.publish();
        }
        Ok(())
    }

    /// Focus an element of the active slide, or clear element focus
    pub fn select_element(&mut self, id: Option<&ElementId>) -> Result<(), StoreError> {
        if let Some(id) = id {
            let on_active = self.active_slide().is_some_and(|s| s.element(id).is_some());
            if !on_active {
                return Err(StoreError::ElementNotFound(id.clone()));
            }
        }
        if self.selection.select_element(id.cloned()) {
            self.publish();
        }
        Ok(())
    }

    // ==================== Rollback ====================

    /// Capture the current tree and selection
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            presentation: self.presentation.clone(),
            selection: self.selection.clone(),
        }
    }

    /// Put back a previously captured state
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.presentation = snapshot.presentation;
        self.selection = snapshot.selection;
        self.publish();
    }

    // ==================== Server reconciliation ====================

    /// Swap a placeholder slide for the one the server created
    ///
    /// Idempotent: once the server slide is present, replaying is a no-op.
    pub fn reconcile_slide(
        &mut self,
        placeholder: &SlideId,
        slide: Slide,
    ) -> Result<Arc<Presentation>, StoreError> {
        let Some(index) = self.current()?.slide_index(placeholder) else {
            debug!("Placeholder slide {} already reconciled or gone", placeholder);
            return self.current_arc();
        };

        let server_id = slide.id.clone();
        let tree = self.tree_mut()?;
        tree.slides[index] = slide;
        tree.renumber_slides();
        self.selection.slide_replaced(placeholder, &server_id);
        self.commit()
    }

    /// Remove a placeholder slide whose creation failed
    ///
    /// If the placeholder was active, focus returns to `fallback` (the
    /// selection from before the add), re-derived against the current tree.
    pub fn discard_slide_placeholder(
        &mut self,
        placeholder: &SlideId,
        fallback: &Selection,
    ) -> Result<Arc<Presentation>, StoreError> {
        let Some(index) = self.current()?.slide_index(placeholder) else {
            return self.current_arc();
        };

        let tree = self.tree_mut()?;
        tree.slides.remove(index);
        tree.renumber_slides();
        if self.selection.active_slide() == Some(placeholder) {
            self.selection = fallback.clone();
        }
        let presentation = self.presentation.clone();
        self.selection.reconcile(presentation.as_deref());
        self.commit()
    }

    /// Swap a placeholder element for the one the server created
    ///
    /// Idempotent in the same way as [`DocumentStore::reconcile_slide`].
    pub fn reconcile_element(
        &mut self,
        slide_id: &SlideId,
        placeholder: &ElementId,
        element: Element,
    ) -> Result<Arc<Presentation>, StoreError> {
        let Some(index) = self
            .current()?
            .slide(slide_id)
            .and_then(|s| s.element_index(placeholder))
        else {
            debug!("Placeholder element {} already reconciled or gone", placeholder);
            return self.current_arc();
        };

        let server_id = element.id.clone();
        if let Some(slide) = self.tree_mut()?.slide_mut(slide_id) {
            slide.elements[index] = element;
        }
        self.selection.element_replaced(placeholder, &server_id);
        self.commit()
    }

    /// Remove a placeholder element whose creation failed
    pub fn discard_element_placeholder(
        &mut self,
        slide_id: &SlideId,
        placeholder: &ElementId,
    ) -> Result<Arc<Presentation>, StoreError> {
        self.apply_element_delete(slide_id, placeholder)
    }

    // ==================== Internals ====================

    fn current(&self) -> Result<&Presentation, StoreError> {
        self.presentation.as_deref().ok_or(StoreError::NotLoaded)
    }

    fn current_arc(&self) -> Result<Arc<Presentation>, StoreError> {
        self.presentation.clone().ok_or(StoreError::NotLoaded)
    }

    fn tree_mut(&mut self) -> Result<&mut Presentation, StoreError> {
        self.presentation
            .as_mut()
            .map(Arc::make_mut)
            .ok_or(StoreError::NotLoaded)
    }

    fn commit(&mut self) -> Result<Arc<Presentation>, StoreError> {
        self.publish();
        self.current_arc()
    }

    fn publish(&mut self) {
        self.revision += 1;
        self.views.send_replace(self.view());
    }
}

/// Check that `order` is a permutation of the presentation's slide ids
fn validate_order(presentation: &Presentation, order: &[SlideId]) -> Result<(), StoreError> {
    if order.len() != presentation.slides.len() {
        return Err(StoreError::InvalidOrder(format!(
            "expected {} slide ids, got {}",
            presentation.slides.len(),
            order.len()
        )));
    }

    let mut seen = HashSet::with_capacity(order.len());
    for id in order {
        if presentation.slide(id).is_none() {
            return Err(StoreError::InvalidOrder(format!("unknown slide {}", id)));
        }
        if !seen.insert(id) {
            return Err(StoreError::InvalidOrder(format!("duplicate slide {}", id)));
        }
    }
    Ok(())
}
