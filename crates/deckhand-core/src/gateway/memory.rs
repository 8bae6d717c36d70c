//! In-process persistence service
//!
//! Implements the same rules as the REST service: integer slide ids, UUID
//! element ids, new slides numbered after the current maximum, and the last
//! slide of a presentation cannot be deleted.
//!
//! Tests can queue failures per call (`fail_next`) and hold every call at a
//! gate (`pause`/`resume`) to observe the optimistic state in flight.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use super::{Gateway, GatewayError, GatewayResult, MediaUpload};
use crate::model::{
    is_hex_color, Element, ElementId, ElementPatch, NewElement, Presentation, PresentationId,
    PresentationSummary, Slide, SlideId, SlidePatch, DEFAULT_TITLE,
};

/// Gateway operations, used to target injected failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayCall {
    ListPresentations,
    CreatePresentation,
    LoadPresentation,
    RenamePresentation,
    DeletePresentation,
    ExportPresentation,
    AddSlide,
    DeleteSlide,
    ReorderSlides,
    UpdateSlide,
    AddElement,
    UpdateElement,
    DeleteElement,
    UploadMedia,
}

#[derive(Debug, Default)]
struct ServiceState {
    presentations: HashMap<PresentationId, StoredPresentation>,
    uploads: HashMap<String, Vec<u8>>,
    next_slide_id: u64,
}

#[derive(Debug)]
struct StoredPresentation {
    presentation: Presentation,
    updated_at: NaiveDateTime,
}

impl StoredPresentation {
    fn new(presentation: Presentation) -> Self {
        Self {
            presentation,
            updated_at: Utc::now().naive_utc(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().naive_utc();
    }

    fn summary(&self) -> PresentationSummary {
        PresentationSummary {
            id: self.presentation.id.clone(),
            title: self.presentation.title.clone(),
            updated_at: Some(self.updated_at),
        }
    }
}

impl ServiceState {
    fn presentation_mut(&mut self, id: &PresentationId) -> GatewayResult<&mut StoredPresentation> {
        self.presentations
            .get_mut(id)
            .ok_or_else(|| GatewayError::NotFound(format!("presentation {}", id)))
    }

    fn owner_of_slide(&mut self, id: &SlideId) -> GatewayResult<&mut StoredPresentation> {
        self.presentations
            .values_mut()
            .find(|p| p.presentation.slide(id).is_some())
            .ok_or_else(|| GatewayError::NotFound(format!("slide {}", id)))
    }

    fn owner_of_element(&mut self, id: &ElementId) -> GatewayResult<&mut StoredPresentation> {
        self.presentations
            .values_mut()
            .find(|p| p.presentation.find_element(id).is_some())
            .ok_or_else(|| GatewayError::NotFound(format!("element {}", id)))
    }

    fn allocate_slide_id(&mut self) -> SlideId {
        self.next_slide_id += 1;
        SlideId::new(self.next_slide_id.to_string())
    }
}

/// Persistence service held in memory
pub struct MemoryGateway {
    state: Mutex<ServiceState>,
    faults: Mutex<HashMap<GatewayCall, VecDeque<GatewayError>>>,
    calls: Mutex<HashMap<GatewayCall, usize>>,
    paused: watch::Sender<bool>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            state: Mutex::new(ServiceState::default()),
            faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            paused,
        }
    }

    /// Seed the service with an existing presentation
    pub fn insert(&self, presentation: Presentation) {
        let mut state = lock(&self.state);
        for slide in &presentation.slides {
            if let Ok(n) = slide.id.as_str().parse::<u64>() {
                state.next_slide_id = state.next_slide_id.max(n);
            }
        }
        state
            .presentations
            .insert(presentation.id.clone(), StoredPresentation::new(presentation));
    }

    /// Server-side copy of a presentation
    pub fn presentation(&self, id: &PresentationId) -> Option<Presentation> {
        lock(&self.state)
            .presentations
            .get(id)
            .map(|p| sorted(&p.presentation))
    }

    /// Bytes previously stored through `upload_media`
    pub fn upload(&self, url: &str) -> Option<Vec<u8>> {
        lock(&self.state).uploads.get(url).cloned()
    }

    /// Make the next `call` fail with `error`
    pub fn fail_next(&self, call: GatewayCall, error: GatewayError) {
        lock(&self.faults).entry(call).or_default().push_back(error);
    }

    /// Number of times `call` has been invoked
    pub fn calls(&self, call: GatewayCall) -> usize {
        lock(&self.calls).get(&call).copied().unwrap_or(0)
    }

    /// Hold every call until `resume`
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Record the call, wait for the gate, then apply any queued failure
    async fn enter(&self, call: GatewayCall) -> GatewayResult<()> {
        *lock(&self.calls).entry(call).or_default() += 1;

        let mut gate = self.paused.subscribe();
        let _ = gate.wait_for(|paused| !*paused).await;

        let fault = lock(&self.faults)
            .get_mut(&call)
            .and_then(|queue| queue.pop_front());
        match fault {
            Some(error) => {
                debug!("Injected failure for {:?}: {}", call, error);
                Err(error)
            }
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Copy with slides in `slide_number` order, as the service returns them
fn sorted(presentation: &Presentation) -> Presentation {
    let mut copy = presentation.clone();
    copy.slides.sort_by_key(|s| s.slide_number);
    copy
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn list_presentations(&self) -> GatewayResult<Vec<PresentationSummary>> {
        self.enter(GatewayCall::ListPresentations).await?;
        let state = lock(&self.state);
        let mut stored: Vec<&StoredPresentation> = state.presentations.values().collect();
        stored.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(stored.into_iter().map(StoredPresentation::summary).collect())
    }

    async fn create_presentation(&self, title: &str) -> GatewayResult<PresentationSummary> {
        self.enter(GatewayCall::CreatePresentation).await?;
        let title = if title.trim().is_empty() {
            DEFAULT_TITLE
        } else {
            title
        };

        let mut state = lock(&self.state);
        let mut presentation =
            Presentation::new(PresentationId::new(Uuid::new_v4().to_string()), title);
        let mut first = Slide::new(state.allocate_slide_id());
        first.slide_number = 1;
        presentation.slides.push(first);

        let stored = StoredPresentation::new(presentation);
        let summary = stored.summary();
        state.presentations.insert(summary.id.clone(), stored);
        Ok(summary)
    }

    async fn load_presentation(&self, id: &PresentationId) -> GatewayResult<Presentation> {
        self.enter(GatewayCall::LoadPresentation).await?;
        self.presentation(id)
            .ok_or_else(|| GatewayError::NotFound(format!("presentation {}", id)))
    }

    async fn rename_presentation(&self, id: &PresentationId, title: &str) -> GatewayResult<()> {
        self.enter(GatewayCall::RenamePresentation).await?;
        let mut state = lock(&self.state);
        let stored = state.presentation_mut(id)?;
        stored.presentation.title = title.to_string();
        stored.touch();
        Ok(())
    }

    async fn delete_presentation(&self, id: &PresentationId) -> GatewayResult<()> {
        self.enter(GatewayCall::DeletePresentation).await?;
        let mut state = lock(&self.state);
        match state.presentations.remove(id) {
            Some(_) => Ok(()),
            None => Err(GatewayError::NotFound(format!("presentation {}", id))),
        }
    }

    async fn export_presentation(&self, id: &PresentationId) -> GatewayResult<Vec<u8>> {
        self.enter(GatewayCall::ExportPresentation).await?;
        let presentation = self
            .presentation(id)
            .ok_or_else(|| GatewayError::NotFound(format!("presentation {}", id)))?;
        serde_json::to_vec_pretty(&presentation)
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }

    async fn add_slide(&self, presentation_id: &PresentationId) -> GatewayResult<Slide> {
        self.enter(GatewayCall::AddSlide).await?;
        let mut state = lock(&self.state);
        let id = state.allocate_slide_id();
        let stored = state.presentation_mut(presentation_id)?;

        let max = stored
            .presentation
            .slides
            .iter()
            .map(|s| s.slide_number)
            .max()
            .unwrap_or(0);
        let mut slide = Slide::new(id);
        slide.slide_number = max + 1;
        stored.presentation.slides.push(slide.clone());
        stored.touch();
        Ok(slide)
    }

    async fn delete_slide(&self, slide_id: &SlideId) -> GatewayResult<()> {
        self.enter(GatewayCall::DeleteSlide).await?;
        let mut state = lock(&self.state);
        let stored = state.owner_of_slide(slide_id)?;

        if stored.presentation.slides.len() <= 1 {
            return Err(GatewayError::Rejected {
                status: 400,
                message: Some("Cannot delete the last slide".to_string()),
            });
        }
        stored.presentation.slides.retain(|s| &s.id != slide_id);
        stored.touch();
        Ok(())
    }

    async fn reorder_slides(
        &self,
        presentation_id: &PresentationId,
        order: &[SlideId],
    ) -> GatewayResult<()> {
        self.enter(GatewayCall::ReorderSlides).await?;
        let mut state = lock(&self.state);
        let stored = state.presentation_mut(presentation_id)?;

        let mut current = stored.presentation.slide_ids();
        let mut requested = order.to_vec();
        current.sort();
        requested.sort();
        if current != requested {
            return Err(GatewayError::Conflict(
                "Slide order does not match the presentation".to_string(),
            ));
        }

        for slide in stored.presentation.slides.iter_mut() {
            if let Some(pos) = order.iter().position(|id| id == &slide.id) {
                slide.slide_number = pos as u32 + 1;
            }
        }
        stored.presentation.slides.sort_by_key(|s| s.slide_number);
        stored.touch();
        Ok(())
    }

    async fn update_slide(&self, slide_id: &SlideId, patch: &SlidePatch) -> GatewayResult<()> {
        self.enter(GatewayCall::UpdateSlide).await?;
        if let Some(ref color) = patch.background_color {
            if !is_hex_color(color) {
                return Err(GatewayError::Rejected {
                    status: 400,
                    message: Some(format!("Invalid colour: {}", color)),
                });
            }
        }

        let mut state = lock(&self.state);
        let stored = state.owner_of_slide(slide_id)?;
        if let Some(slide) = stored.presentation.slide_mut(slide_id) {
            patch.apply(slide);
        }
        stored.touch();
        Ok(())
    }

    async fn add_element(
        &self,
        slide_id: &SlideId,
        element: &NewElement,
    ) -> GatewayResult<Element> {
        self.enter(GatewayCall::AddElement).await?;
        let created = element
            .build(ElementId::new(Uuid::new_v4().to_string()))
            .ok_or_else(|| GatewayError::Rejected {
                status: 400,
                message: Some(format!("{} elements need content", element.element_type)),
            })?;

        let mut state = lock(&self.state);
        let stored = state.owner_of_slide(slide_id)?;
        if let Some(slide) = stored.presentation.slide_mut(slide_id) {
            slide.elements.push(created.clone());
        }
        stored.touch();
        Ok(created)
    }

    async fn update_element(
        &self,
        element_id: &ElementId,
        patch: &ElementPatch,
    ) -> GatewayResult<()> {
        self.enter(GatewayCall::UpdateElement).await?;
        let mut state = lock(&self.state);
        let stored = state.owner_of_element(element_id)?;
        if let Some(element) = stored
            .presentation
            .slides
            .iter_mut()
            .find_map(|s| s.element_mut(element_id))
        {
            element.apply_patch(patch);
        }
        stored.touch();
        Ok(())
    }

    async fn delete_element(&self, element_id: &ElementId) -> GatewayResult<()> {
        self.enter(GatewayCall::DeleteElement).await?;
        let mut state = lock(&self.state);
        let stored = state.owner_of_element(element_id)?;
        for slide in stored.presentation.slides.iter_mut() {
            slide.elements.retain(|e| &e.id != element_id);
        }
        stored.touch();
        Ok(())
    }

    async fn upload_media(&self, upload: &MediaUpload) -> GatewayResult<String> {
        self.enter(GatewayCall::UploadMedia).await?;
        if upload.bytes.is_empty() {
            return Err(GatewayError::Rejected {
                status: 400,
                message: Some("Uploaded file is empty".to_string()),
            });
        }

        let url = format!("memory://uploads/{}/{}", Uuid::new_v4(), upload.file_name);
        lock(&self.state)
            .uploads
            .insert(url.clone(), upload.bytes.clone());
        Ok(url)
    }
}
