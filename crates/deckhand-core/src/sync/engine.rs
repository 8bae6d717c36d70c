//! Sync engine implementation

use std::sync::{Arc, Weak};

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::operation::Operation;
use super::outcome::{SyncError, SyncOutcome};
use crate::gateway::{Gateway, GatewayError, GatewayResult, MediaUpload};
use crate::model::{
    is_hex_color, ElementId, ElementPatch, Frame, NewElement, PresentationId, Slide, SlideId,
    SlidePatch,
};
use crate::notify::{Notifier, Severity};
use crate::store::{DocumentStore, SharedStore, Snapshot, StoreError};

/// Drives optimistic document operations against a gateway
pub struct SyncEngine {
    /// Weak so that a torn-down store is detected when a call resolves
    store: Weak<Mutex<DocumentStore>>,
    gateway: Arc<dyn Gateway>,
    notifier: Arc<dyn Notifier>,
}

impl SyncEngine {
    pub fn new(store: &SharedStore, gateway: Arc<dyn Gateway>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store: Arc::downgrade(store),
            gateway,
            notifier,
        }
    }

    /// The store, if it is still alive
    pub fn store(&self) -> Option<SharedStore> {
        self.store.upgrade()
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    // ==================== Presentation ====================

    /// Fetch a presentation and replace the store's tree with it
    ///
    /// On failure the store is left as it was.
    pub async fn load(&self, id: &PresentationId) -> SyncOutcome {
        if self.store.upgrade().is_none() {
            return SyncOutcome::Detached;
        }

        debug!("Loading presentation {}", id);
        let result = self.gateway.load_presentation(id).await;

        let Some(shared) = self.store.upgrade() else {
            return self.detached(Operation::Load);
        };
        match result {
            Ok(presentation) => {
                info!(
                    "Loaded presentation {} ({} slides)",
                    presentation.id,
                    presentation.slides.len()
                );
                shared.lock().await.load(presentation);
                SyncOutcome::Committed
            }
            Err(err) => self.fail(Operation::Load, err),
        }
    }

    pub async fn rename(&self, title: &str) -> SyncOutcome {
        let op = Operation::Rename;
        let title = title.trim();
        if title.is_empty() {
            return self.reject(op, SyncError::BlankTitle);
        }

        let begun = self
            .begin(op, |store| {
                let id = loaded_id(store)?;
                store.rename(title)?;
                Ok(id)
            })
            .await;
        let (id, snapshot) = match begun {
            Ok(begun) => begun,
            Err(outcome) => return outcome,
        };

        let result = self.gateway.rename_presentation(&id, title).await;
        self.settle(op, snapshot, result).await
    }

    // ==================== Slides ====================

    /// Append a slide; a placeholder is shown until the server assigns its id
    pub async fn add_slide(&self) -> SyncOutcome {
        let op = Operation::AddSlide;
        let placeholder = Slide::placeholder();
        let placeholder_id = placeholder.id.clone();

        let begun = self
            .begin(op, |store| {
                let id = loaded_id(store)?;
                let fallback = store.selection().clone();
                store.apply_slide_add(placeholder)?;
                Ok((id, fallback))
            })
            .await;
        let ((presentation_id, fallback), _) = match begun {
            Ok(begun) => begun,
            Err(outcome) => return outcome,
        };

        let result = self.gateway.add_slide(&presentation_id).await;

        let Some(shared) = self.store.upgrade() else {
            return self.detached(op);
        };
        let mut store = shared.lock().await;
        let result = result.map_err(SyncError::from).and_then(|slide| {
            if is_assigned(slide.id.as_str(), slide.id.is_placeholder()) {
                Ok(slide)
            } else {
                error!("Server returned slide without a usable id: {:?}", slide.id);
                Err(SyncError::PartialData("slide id missing".to_string()))
            }
        });

        match result {
            Ok(slide) => {
                debug!("Slide {} saved as {}", placeholder_id, slide.id);
                if let Err(e) = store.reconcile_slide(&placeholder_id, slide) {
                    warn!("Could not merge new slide: {}", e);
                }
                self.succeed(op);
                SyncOutcome::Committed
            }
            Err(err) => {
                if let Err(e) = store.discard_slide_placeholder(&placeholder_id, &fallback) {
                    warn!("Could not discard placeholder slide: {}", e);
                }
                self.rolled_back(op, err)
            }
        }
    }

    pub async fn delete_slide(&self, slide_id: &SlideId) -> SyncOutcome {
        let op = Operation::DeleteSlide;
        if slide_id.is_placeholder() {
            return self.reject(op, SyncError::unsaved_slide(slide_id));
        }

        let begun = self
            .begin(op, |store| {
                require_slide(store, slide_id)?;
                store.apply_slide_delete(slide_id)?;
                Ok(())
            })
            .await;
        let ((), snapshot) = match begun {
            Ok(begun) => begun,
            Err(outcome) => return outcome,
        };

        let result = self.gateway.delete_slide(slide_id).await;
        self.settle(op, snapshot, result).await
    }

    /// Put slides in the given order; `order` must name every slide once
    pub async fn reorder_slides(&self, order: &[SlideId]) -> SyncOutcome {
        let op = Operation::ReorderSlides;
        if let Some(unsaved) = order.iter().find(|id| id.is_placeholder()) {
            return self.reject(op, SyncError::unsaved_slide(unsaved));
        }

        let begun = self
            .begin(op, |store| {
                let id = loaded_id(store)?;
                store.apply_slide_reorder(order)?;
                Ok(id)
            })
            .await;
        let (presentation_id, snapshot) = match begun {
            Ok(begun) => begun,
            Err(outcome) => return outcome,
        };

        let result = self.gateway.reorder_slides(&presentation_id, order).await;
        self.settle(op, snapshot, result).await
    }

    pub async fn set_slide_background(&self, slide_id: &SlideId, color: &str) -> SyncOutcome {
        let op = Operation::UpdateSlide;
        if !is_hex_color(color) {
            return self.reject(op, SyncError::InvalidColor(color.to_string()));
        }
        if slide_id.is_placeholder() {
            return self.reject(op, SyncError::unsaved_slide(slide_id));
        }

        let patch = SlidePatch::background(color);
        let begun = self
            .begin(op, |store| {
                require_slide(store, slide_id)?;
                store.apply_slide_update(slide_id, &patch)?;
                Ok(())
            })
            .await;
        let ((), snapshot) = match begun {
            Ok(begun) => begun,
            Err(outcome) => return outcome,
        };

        let result = self.gateway.update_slide(slide_id, &patch).await;
        self.settle(op, snapshot, result).await
    }

    // ==================== Elements ====================

    /// Add an element; a placeholder is shown until the server assigns its id
    pub async fn add_element(&self, slide_id: &SlideId, request: NewElement) -> SyncOutcome {
        let op = Operation::AddElement;
        if slide_id.is_placeholder() {
            return self.reject(op, SyncError::unsaved_slide(slide_id));
        }
        let Some(placeholder) = request.build(ElementId::placeholder()) else {
            return self.reject(op, SyncError::MissingMediaUrl);
        };
        let placeholder_id = placeholder.id.clone();

        let begun = self
            .begin(op, |store| {
                store.apply_element_add(slide_id, placeholder)?;
                Ok(())
            })
            .await;
        if let Err(outcome) = begun {
            return outcome;
        }

        let result = self.gateway.add_element(slide_id, &request).await;

        let Some(shared) = self.store.upgrade() else {
            return self.detached(op);
        };
        let mut store = shared.lock().await;
        let result = result.map_err(SyncError::from).and_then(|element| {
            if is_assigned(element.id.as_str(), element.id.is_placeholder()) {
                Ok(element)
            } else {
                error!("Server returned element without a usable id: {:?}", element.id);
                Err(SyncError::PartialData("element id missing".to_string()))
            }
        });

        match result {
            Ok(element) => {
                debug!("Element {} saved as {}", placeholder_id, element.id);
                if let Err(e) = store.reconcile_element(slide_id, &placeholder_id, element) {
                    warn!("Could not merge new element: {}", e);
                }
                SyncOutcome::Committed
            }
            Err(err) => {
                if let Err(e) = store.discard_element_placeholder(slide_id, &placeholder_id) {
                    warn!("Could not discard placeholder element: {}", e);
                }
                self.rolled_back(op, err)
            }
        }
    }

    /// Merge a patch into an element (move, resize, edit content)
    pub async fn update_element(&self, element_id: &ElementId, patch: ElementPatch) -> SyncOutcome {
        let op = Operation::UpdateElement;
        if patch.is_empty() {
            return self.reject(op, SyncError::EmptyPatch);
        }
        if element_id.is_placeholder() {
            return self.reject(op, SyncError::unsaved_element(element_id));
        }

        let begun = self
            .begin(op, |store| {
                let slide_id = owning_slide(store, element_id)?;
                store.apply_element_update(&slide_id, element_id, &patch)?;
                Ok(())
            })
            .await;
        let ((), snapshot) = match begun {
            Ok(begun) => begun,
            Err(outcome) => return outcome,
        };

        let result = self.gateway.update_element(element_id, &patch).await;
        self.settle(op, snapshot, result).await
    }

    pub async fn delete_element(&self, element_id: &ElementId) -> SyncOutcome {
        let op = Operation::DeleteElement;
        if element_id.is_placeholder() {
            return self.reject(op, SyncError::unsaved_element(element_id));
        }

        let begun = self
            .begin(op, |store| {
                let slide_id = owning_slide(store, element_id)?;
                store.apply_element_delete(&slide_id, element_id)?;
                Ok(())
            })
            .await;
        let ((), snapshot) = match begun {
            Ok(begun) => begun,
            Err(outcome) => return outcome,
        };

        let result = self.gateway.delete_element(element_id).await;
        self.settle(op, snapshot, result).await
    }

    /// Upload a file, then add an image or video element showing it
    ///
    /// Nothing is applied locally until the upload has returned a URL.
    pub async fn insert_media(
        &self,
        slide_id: &SlideId,
        upload: MediaUpload,
        frame: Option<Frame>,
    ) -> SyncOutcome {
        let op = Operation::UploadMedia;
        if slide_id.is_placeholder() {
            return self.reject(op, SyncError::unsaved_slide(slide_id));
        }

        let checked = self.begin(op, |store| require_slide(store, slide_id)).await;
        if let Err(outcome) = checked {
            return outcome;
        }

        debug!("Uploading {} ({} bytes)", upload.file_name, upload.bytes.len());
        let url = match self.gateway.upload_media(&upload).await {
            Ok(url) => url,
            Err(err) => {
                if self.store.upgrade().is_none() {
                    return self.detached(op);
                }
                return self.fail(op, err);
            }
        };

        let mut request = NewElement::media(upload.element_type(), url);
        request.frame = frame;
        self.add_element(slide_id, request).await
    }

    // ==================== Protocol steps ====================

    /// Snapshot the store and apply an optimistic change under one lock
    ///
    /// A failing `apply` must leave the store untouched; it is reported as
    /// a rejection.
    async fn begin<T>(
        &self,
        op: Operation,
        apply: impl FnOnce(&mut DocumentStore) -> Result<T, SyncError>,
    ) -> Result<(T, Snapshot), SyncOutcome> {
        let Some(shared) = self.store.upgrade() else {
            return Err(SyncOutcome::Detached);
        };
        let mut store = shared.lock().await;
        let snapshot = store.snapshot();
        match apply(&mut *store) {
            Ok(value) => Ok((value, snapshot)),
            Err(err) => Err(self.reject(op, err)),
        }
    }

    /// Commit or roll back once the gateway has answered
    async fn settle(&self, op: Operation, snapshot: Snapshot, result: GatewayResult<()>) -> SyncOutcome {
        let Some(shared) = self.store.upgrade() else {
            return self.detached(op);
        };
        match result {
            Ok(()) => {
                self.succeed(op);
                SyncOutcome::Committed
            }
            Err(err) => {
                shared.lock().await.restore(snapshot);
                self.fail(op, err)
            }
        }
    }

    fn succeed(&self, op: Operation) {
        debug!("{} committed", op);
        if let Some(message) = op.success_message() {
            self.notifier.notify(message, Severity::Success);
        }
    }

    fn fail(&self, op: Operation, err: GatewayError) -> SyncOutcome {
        self.rolled_back(op, SyncError::Gateway(err))
    }

    fn rolled_back(&self, op: Operation, err: SyncError) -> SyncOutcome {
        warn!("{} failed, rolled back: {}", op, err);
        let message = match &err {
            SyncError::Gateway(e) => e.server_message().unwrap_or(op.failure_message()),
            _ => op.failure_message(),
        };
        self.notifier.notify(message, Severity::Error);
        SyncOutcome::RolledBack(err)
    }

    fn reject(&self, op: Operation, err: SyncError) -> SyncOutcome {
        debug!("{} rejected: {}", op, err);
        self.notifier.notify(&err.to_string(), Severity::Error);
        SyncOutcome::Rejected(err)
    }

    fn detached(&self, op: Operation) -> SyncOutcome {
        debug!("Store dropped before {} resolved; discarding result", op);
        SyncOutcome::Detached
    }
}

fn loaded_id(store: &DocumentStore) -> Result<PresentationId, SyncError> {
    store
        .presentation()
        .map(|p| p.id.clone())
        .ok_or(SyncError::Store(StoreError::NotLoaded))
}

fn require_slide(store: &DocumentStore, slide_id: &SlideId) -> Result<(), SyncError> {
    if !store.is_loaded() {
        return Err(StoreError::NotLoaded.into());
    }
    match store.slide(slide_id) {
        Some(_) => Ok(()),
        None => Err(StoreError::SlideNotFound(slide_id.clone()).into()),
    }
}

fn owning_slide(store: &DocumentStore, element_id: &ElementId) -> Result<SlideId, SyncError> {
    if !store.is_loaded() {
        return Err(StoreError::NotLoaded.into());
    }
    store
        .find_element(element_id)
        .map(|(slide, _)| slide.id.clone())
        .ok_or_else(|| StoreError::ElementNotFound(element_id.clone()).into())
}

/// Whether a server-returned id can replace a placeholder
fn is_assigned(id: &str, placeholder: bool) -> bool {
    !id.trim().is_empty() && !placeholder
}
