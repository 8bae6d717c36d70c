//! Element command handlers

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use deckhand_core::{
    ElementId, ElementPatch, ElementType, Frame, Gateway, MediaUpload, NewElement, SlideId,
};

use super::Session;
use crate::output::Output;

/// Element kinds accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Text,
    Image,
    Youtube,
    Video,
}

impl From<KindArg> for ElementType {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Text => ElementType::Text,
            KindArg::Image => ElementType::Image,
            KindArg::Youtube => ElementType::YoutubeVideo,
            KindArg::Video => ElementType::UploadedVideo,
        }
    }
}

/// Position and size flags
#[derive(Debug, Clone, Default, Args)]
pub struct GeometryArgs {
    /// Left edge in canvas pixels
    #[arg(long)]
    pub x: Option<f64>,
    /// Top edge in canvas pixels
    #[arg(long)]
    pub y: Option<f64>,
    #[arg(long)]
    pub width: Option<f64>,
    #[arg(long)]
    pub height: Option<f64>,
}

impl GeometryArgs {
    fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.width.is_none() && self.height.is_none()
    }

    /// Full frame, with unset values taken from the default frame
    fn frame(&self) -> Option<Frame> {
        if self.is_empty() {
            return None;
        }
        let base = Frame::default();
        Some(Frame {
            pos_x: self.x.unwrap_or(base.pos_x),
            pos_y: self.y.unwrap_or(base.pos_y),
            width: self.width.unwrap_or(base.width),
            height: self.height.unwrap_or(base.height),
        })
    }
}

pub async fn add(
    gateway: Arc<dyn Gateway>,
    presentation: String,
    slide: String,
    kind: KindArg,
    content: Option<String>,
    geometry: GeometryArgs,
    output: &Output,
) -> Result<()> {
    let request = new_element(kind, content, &geometry);
    let session = Session::open(gateway, &presentation, output).await?;
    let outcome = session
        .engine()
        .add_element(&SlideId::new(slide), request)
        .await;
    session.finish(outcome, output).await
}

pub async fn update(
    gateway: Arc<dyn Gateway>,
    presentation: String,
    element: String,
    content: Option<String>,
    font_size: Option<u32>,
    geometry: GeometryArgs,
    output: &Output,
) -> Result<()> {
    let patch = ElementPatch {
        pos_x: geometry.x,
        pos_y: geometry.y,
        width: geometry.width,
        height: geometry.height,
        content,
        font_size,
    };
    let session = Session::open(gateway, &presentation, output).await?;
    let outcome = session
        .engine()
        .update_element(&ElementId::new(element), patch)
        .await;
    session.finish(outcome, output).await
}

pub async fn delete(
    gateway: Arc<dyn Gateway>,
    presentation: String,
    element: String,
    output: &Output,
) -> Result<()> {
    let session = Session::open(gateway, &presentation, output).await?;
    let outcome = session
        .engine()
        .delete_element(&ElementId::new(element))
        .await;
    session.finish(outcome, output).await
}

/// Upload an image or video file and place it on a slide
pub async fn upload(
    gateway: Arc<dyn Gateway>,
    presentation: String,
    slide: String,
    file: &Path,
    geometry: GeometryArgs,
    output: &Output,
) -> Result<()> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {:?}", file))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let upload = MediaUpload::new(file_name, bytes);

    let session = Session::open(gateway, &presentation, output).await?;
    let outcome = session
        .engine()
        .insert_media(&SlideId::new(slide), upload, geometry.frame())
        .await;
    session.finish(outcome, output).await
}

fn new_element(kind: KindArg, content: Option<String>, geometry: &GeometryArgs) -> NewElement {
    let mut request = NewElement {
        element_type: kind.into(),
        content,
        frame: None,
    };
    if let Some(frame) = geometry.frame() {
        request = request.with_frame(frame);
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use deckhand_core::{ElementKind, MemoryGateway, Presentation, PresentationId, Slide};

    fn seeded() -> Arc<MemoryGateway> {
        let gateway = Arc::new(MemoryGateway::new());
        let mut presentation = Presentation::new(PresentationId::new("p1"), "Deck");
        presentation.slides.push(Slide::new(SlideId::new("1")));
        gateway.insert(presentation);
        gateway
    }

    #[test]
    fn test_geometry_fills_defaults() {
        let geometry = GeometryArgs {
            x: Some(10.0),
            ..GeometryArgs::default()
        };
        let frame = geometry.frame().unwrap();
        assert_eq!(frame.pos_x, 10.0);
        assert_eq!(frame.width, Frame::default().width);

        assert!(GeometryArgs::default().frame().is_none());
    }

    #[test]
    fn test_new_element_kinds() {
        let request = new_element(
            KindArg::Youtube,
            Some("https://youtu.be/abc".into()),
            &GeometryArgs::default(),
        );
        assert_eq!(request.element_type, ElementType::YoutubeVideo);
        assert!(request.frame.is_none());

        let request = new_element(KindArg::Text, None, &GeometryArgs::default());
        let built = request.build(ElementId::new("e")).unwrap();
        assert_eq!(built.kind.content(), "New text");
    }

    #[tokio::test]
    async fn test_add_and_upload() {
        let gateway = seeded();
        let output = Output::new(OutputFormat::Quiet);

        add(
            gateway.clone(),
            "p1".into(),
            "1".into(),
            KindArg::Text,
            Some("Hello".into()),
            GeometryArgs::default(),
            &output,
        )
        .await
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("logo.png");
        std::fs::write(&file, [137, 80, 78, 71]).unwrap();
        upload(
            gateway.clone(),
            "p1".into(),
            "1".into(),
            &file,
            GeometryArgs::default(),
            &output,
        )
        .await
        .unwrap();

        let saved = gateway.presentation(&PresentationId::new("p1")).unwrap();
        let elements = &saved.slides[0].elements;
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].kind.content(), "Hello");
        assert!(matches!(elements[1].kind, ElementKind::Image { .. }));
    }

    #[tokio::test]
    async fn test_empty_update_fails() {
        let gateway = seeded();
        let output = Output::new(OutputFormat::Quiet);

        let result = update(
            gateway,
            "p1".into(),
            "e1".into(),
            None,
            None,
            GeometryArgs::default(),
            &output,
        )
        .await;
        assert!(result.is_err());
    }
}
