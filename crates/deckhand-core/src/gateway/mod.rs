//! Persistence gateway
//!
//! The narrow request/response contract the sync engine uses to reach the
//! persistence service. Two implementations ship with the crate:
//!
//! - `HttpGateway`: talks to the REST service over HTTP
//! - `MemoryGateway`: an in-process service with the same rules, used for
//!   tests and offline runs

mod error;
mod http;
mod memory;

use async_trait::async_trait;

use crate::model::{
    Element, ElementId, ElementPatch, ElementType, NewElement, Presentation, PresentationId,
    PresentationSummary, Slide, SlideId, SlidePatch,
};

pub use error::{GatewayError, GatewayResult};
pub use http::HttpGateway;
pub use memory::{GatewayCall, MemoryGateway};

/// Remote CRUD operations on presentations, slides and elements
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list_presentations(&self) -> GatewayResult<Vec<PresentationSummary>>;

    async fn create_presentation(&self, title: &str) -> GatewayResult<PresentationSummary>;

    /// Fetch the full tree
    async fn load_presentation(&self, id: &PresentationId) -> GatewayResult<Presentation>;

    async fn rename_presentation(&self, id: &PresentationId, title: &str) -> GatewayResult<()>;

    /// Remove a presentation with all of its slides and elements
    async fn delete_presentation(&self, id: &PresentationId) -> GatewayResult<()>;

    /// Download the presentation in the service's export format
    async fn export_presentation(&self, id: &PresentationId) -> GatewayResult<Vec<u8>>;

    /// Create a slide at the end; the server assigns the id
    async fn add_slide(&self, presentation_id: &PresentationId) -> GatewayResult<Slide>;

    async fn delete_slide(&self, slide_id: &SlideId) -> GatewayResult<()>;

    async fn reorder_slides(
        &self,
        presentation_id: &PresentationId,
        order: &[SlideId],
    ) -> GatewayResult<()>;

    async fn update_slide(&self, slide_id: &SlideId, patch: &SlidePatch) -> GatewayResult<()>;

    /// Create an element; the server assigns the id
    async fn add_element(&self, slide_id: &SlideId, element: &NewElement)
        -> GatewayResult<Element>;

    async fn update_element(&self, element_id: &ElementId, patch: &ElementPatch)
        -> GatewayResult<()>;

    async fn delete_element(&self, element_id: &ElementId) -> GatewayResult<()>;

    /// Store a binary payload and return the URL it is served from
    async fn upload_media(&self, upload: &MediaUpload) -> GatewayResult<String>;
}

/// A file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    /// Create an upload, guessing the content type from the file name
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn is_video(&self) -> bool {
        self.content_type.starts_with("video/")
    }

    /// Element type that should display this upload
    pub fn element_type(&self) -> ElementType {
        if self.is_video() {
            ElementType::UploadedVideo
        } else {
            ElementType::Image
        }
    }
}

fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_upload_content_type() {
        let image = MediaUpload::new("Photo.JPG", vec![1, 2, 3]);
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(image.element_type(), ElementType::Image);

        let video = MediaUpload::new("clip.webm", vec![0]);
        assert!(video.is_video());
        assert_eq!(video.element_type(), ElementType::UploadedVideo);

        let unknown = MediaUpload::new("README", vec![]);
        assert_eq!(unknown.content_type, "application/octet-stream");
    }
}
