//! Data models for Deckhand
//!
//! Defines the document tree: a Presentation owns ordered Slides, a Slide owns
//! ordered Elements. The wire shapes match the persistence service's JSON.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Background colour given to slides the service returns without one
pub const DEFAULT_BACKGROUND: &str = "#FFFFFF";

/// Title used when a presentation is created without one
pub const DEFAULT_TITLE: &str = "New presentation";

/// Content of a freshly added text element
pub const DEFAULT_TEXT: &str = "New text";

/// Font size of a freshly added text element
pub const DEFAULT_FONT_SIZE: u32 = 24;

/// Logical canvas size elements are positioned against
pub const CANVAS_WIDTH: f64 = 1280.0;
pub const CANVAS_HEIGHT: f64 = 720.0;

/// Prefix of client-temporary ids
const PLACEHOLDER_PREFIX: &str = "tmp-";

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a server-assigned id
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a client-temporary id
            pub fn placeholder() -> Self {
                Self(format!("{}{}", PLACEHOLDER_PREFIX, Uuid::new_v4()))
            }

            /// Whether this id was generated locally and has no server counterpart yet
            pub fn is_placeholder(&self) -> bool {
                self.0.starts_with(PLACEHOLDER_PREFIX)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                // The service uses integer keys for some tables and UUIDs for others
                #[derive(Deserialize)]
                #[serde(untagged)]
                enum Raw {
                    Number(i64),
                    Text(String),
                }

                Ok(match Raw::deserialize(deserializer)? {
                    Raw::Number(n) => Self(n.to_string()),
                    Raw::Text(s) => Self(s),
                })
            }
        }
    };
}

entity_id!(
    /// Presentation identifier
    PresentationId
);
entity_id!(
    /// Slide identifier, unique within a presentation
    SlideId
);
entity_id!(
    /// Element identifier, unique within its slide
    ElementId
);

/// Position and size of an element on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub pos_x: f64,
    pub pos_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            pos_x: 100.0,
            pos_y: 100.0,
            width: 400.0,
            height: 150.0,
        }
    }
}

/// Wire tag for element kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementType {
    Text,
    Image,
    YoutubeVideo,
    #[serde(alias = "VIDEO")]
    UploadedVideo,
}

impl ElementType {
    /// Whether elements of this type reference a media URL
    pub fn is_media(self) -> bool {
        !matches!(self, ElementType::Text)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementType::Text => "TEXT",
            ElementType::Image => "IMAGE",
            ElementType::YoutubeVideo => "YOUTUBE_VIDEO",
            ElementType::UploadedVideo => "UPLOADED_VIDEO",
        };
        f.write_str(s)
    }
}

/// What an element shows, with only the fields relevant to each kind
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Text { content: String, font_size: u32 },
    Image { url: String },
    YoutubeVideo { url: String },
    UploadedVideo { url: String },
}

impl ElementKind {
    pub fn element_type(&self) -> ElementType {
        match self {
            ElementKind::Text { .. } => ElementType::Text,
            ElementKind::Image { .. } => ElementType::Image,
            ElementKind::YoutubeVideo { .. } => ElementType::YoutubeVideo,
            ElementKind::UploadedVideo { .. } => ElementType::UploadedVideo,
        }
    }

    /// Text for text elements, source URL for media elements
    pub fn content(&self) -> &str {
        match self {
            ElementKind::Text { content, .. } => content,
            ElementKind::Image { url }
            | ElementKind::YoutubeVideo { url }
            | ElementKind::UploadedVideo { url } => url,
        }
    }

    /// Preview image for YouTube elements
    pub fn thumbnail_url(&self) -> Option<String> {
        match self {
            ElementKind::YoutubeVideo { url } => youtube_video_id(url)
                .map(|id| format!("https://img.youtube.com/vi/{}/hqdefault.jpg", id)),
            _ => None,
        }
    }

    fn from_parts(element_type: ElementType, content: Option<String>, font_size: Option<u32>) -> Self {
        let content = content.unwrap_or_default();
        match element_type {
            ElementType::Text => ElementKind::Text {
                content,
                font_size: font_size.unwrap_or(DEFAULT_FONT_SIZE),
            },
            ElementType::Image => ElementKind::Image { url: content },
            ElementType::YoutubeVideo => ElementKind::YoutubeVideo { url: content },
            ElementType::UploadedVideo => ElementKind::UploadedVideo { url: content },
        }
    }
}

/// A positioned element on a slide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ElementRecord", into = "ElementRecord")]
pub struct Element {
    pub id: ElementId,
    pub frame: Frame,
    pub kind: ElementKind,
}

impl Element {
    pub fn element_type(&self) -> ElementType {
        self.kind.element_type()
    }

    /// Merge a partial update into this element
    ///
    /// `content` replaces the text or the media URL; `font_size` only
    /// applies to text elements.
    pub fn apply_patch(&mut self, patch: &ElementPatch) {
        if let Some(x) = patch.pos_x {
            self.frame.pos_x = x;
        }
        if let Some(y) = patch.pos_y {
            self.frame.pos_y = y;
        }
        if let Some(width) = patch.width {
            self.frame.width = width;
        }
        if let Some(height) = patch.height {
            self.frame.height = height;
        }

        match &mut self.kind {
            ElementKind::Text { content, font_size } => {
                if let Some(ref c) = patch.content {
                    *content = c.clone();
                }
                if let Some(size) = patch.font_size {
                    *font_size = size;
                }
            }
            ElementKind::Image { url }
            | ElementKind::YoutubeVideo { url }
            | ElementKind::UploadedVideo { url } => {
                if let Some(ref c) = patch.content {
                    *url = c.clone();
                }
            }
        }
    }
}

/// Flat wire representation of an element
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ElementRecord {
    id: ElementId,
    element_type: ElementType,
    pos_x: f64,
    pos_y: f64,
    width: f64,
    height: f64,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_size: Option<u32>,
}

impl From<ElementRecord> for Element {
    fn from(r: ElementRecord) -> Self {
        Self {
            id: r.id,
            frame: Frame {
                pos_x: r.pos_x,
                pos_y: r.pos_y,
                width: r.width,
                height: r.height,
            },
            kind: ElementKind::from_parts(r.element_type, r.content, r.font_size),
        }
    }
}

impl From<Element> for ElementRecord {
    fn from(e: Element) -> Self {
        let element_type = e.element_type();
        let (content, font_size) = match e.kind {
            ElementKind::Text { content, font_size } => (Some(content), Some(font_size)),
            ElementKind::Image { url }
            | ElementKind::YoutubeVideo { url }
            | ElementKind::UploadedVideo { url } => ((!url.is_empty()).then_some(url), None),
        };
        Self {
            id: e.id,
            element_type,
            pos_x: e.frame.pos_x,
            pos_y: e.frame.pos_y,
            width: e.frame.width,
            height: e.frame.height,
            content,
            font_size,
        }
    }
}

/// Partial element update; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
}

impl ElementPatch {
    /// Patch that moves an element
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            pos_x: Some(x),
            pos_y: Some(y),
            ..Self::default()
        }
    }

    /// Patch that resizes an element
    pub fn size(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// Patch that replaces an element's content
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Request to create an element; the service assigns the id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewElement {
    pub element_type: ElementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(flatten)]
    pub frame: Option<Frame>,
}

impl NewElement {
    /// A text element with the given content
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            element_type: ElementType::Text,
            content: Some(content.into()),
            frame: None,
        }
    }

    /// A media element pointing at `url`
    pub fn media(element_type: ElementType, url: impl Into<String>) -> Self {
        Self {
            element_type,
            content: Some(url.into()),
            frame: None,
        }
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Materialise the element under `id`, filling in defaults
    ///
    /// Returns `None` for media elements without a URL.
    pub fn build(&self, id: ElementId) -> Option<Element> {
        let content = match (self.element_type, &self.content) {
            (ElementType::Text, None) => DEFAULT_TEXT.to_string(),
            (_, Some(c)) if !(self.element_type.is_media() && c.trim().is_empty()) => c.clone(),
            _ => return None,
        };
        Some(Element {
            id,
            frame: self.frame.unwrap_or_default(),
            kind: ElementKind::from_parts(self.element_type, Some(content), None),
        })
    }
}

/// A slide in a presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub id: SlideId,
    /// Mirrors the slide's position; the sequence order is canonical
    #[serde(default)]
    pub slide_number: u32,
    #[serde(default = "default_background")]
    pub background_color: String,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Slide {
    /// An empty slide with the given id
    pub fn new(id: SlideId) -> Self {
        Self {
            id,
            slide_number: 0,
            background_color: DEFAULT_BACKGROUND.to_string(),
            elements: Vec::new(),
        }
    }

    /// An empty slide under a client-temporary id
    pub fn placeholder() -> Self {
        Self::new(SlideId::placeholder())
    }

    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| &e.id == id)
    }

    pub fn element_mut(&mut self, id: &ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| &e.id == id)
    }

    pub fn element_index(&self, id: &ElementId) -> Option<usize> {
        self.elements.iter().position(|e| &e.id == id)
    }
}

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_string()
}

/// Partial slide update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlidePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

impl SlidePatch {
    pub fn background(color: impl Into<String>) -> Self {
        Self {
            background_color: Some(color.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.background_color.is_none()
    }

    pub fn apply(&self, slide: &mut Slide) {
        if let Some(ref color) = self.background_color {
            slide.background_color = color.clone();
        }
    }
}

/// Check for a `#RRGGBB` colour
pub fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// A presentation: a titled, ordered sequence of slides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub id: PresentationId,
    pub title: String,
    #[serde(default)]
    pub slides: Vec<Slide>,
}

impl Presentation {
    pub fn new(id: PresentationId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            slides: Vec::new(),
        }
    }

    pub fn slide(&self, id: &SlideId) -> Option<&Slide> {
        self.slides.iter().find(|s| &s.id == id)
    }

    pub fn slide_mut(&mut self, id: &SlideId) -> Option<&mut Slide> {
        self.slides.iter_mut().find(|s| &s.id == id)
    }

    pub fn slide_index(&self, id: &SlideId) -> Option<usize> {
        self.slides.iter().position(|s| &s.id == id)
    }

    /// Locate an element anywhere in the presentation
    pub fn find_element(&self, id: &ElementId) -> Option<(&Slide, &Element)> {
        self.slides
            .iter()
            .find_map(|s| s.element(id).map(|e| (s, e)))
    }

    /// Set each slide's number from its position (1-based)
    pub fn renumber_slides(&mut self) {
        for (i, slide) in self.slides.iter_mut().enumerate() {
            slide.slide_number = i as u32 + 1;
        }
    }

    pub fn slide_ids(&self) -> Vec<SlideId> {
        self.slides.iter().map(|s| s.id.clone()).collect()
    }
}

/// Listing entry for a presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationSummary {
    pub id: PresentationId,
    pub title: String,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
}

/// Extract the video id from a YouTube watch, short-link, embed or shorts URL
pub fn youtube_video_id(url: &str) -> Option<&str> {
    const MARKERS: &[&str] = &["youtu.be/", "/embed/", "/shorts/", "v="];

    if !url.contains("youtu") {
        return None;
    }
    let start = MARKERS
        .iter()
        .find_map(|m| url.find(m).map(|i| i + m.len()))?;
    let rest = &url[start..];
    let end = rest.find(['&', '?', '#', '/']).unwrap_or(rest.len());
    let id = &rest[..end];

    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_ids() {
        let id = ElementId::placeholder();
        assert!(id.is_placeholder());
        assert!(id.as_str().starts_with("tmp-"));

        assert!(!ElementId::new("3f2a").is_placeholder());
        assert_ne!(SlideId::placeholder(), SlideId::placeholder());
    }

    #[test]
    fn test_slide_id_from_number_or_string() {
        let from_number: SlideId = serde_json::from_str("42").unwrap();
        let from_string: SlideId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.as_str(), "42");
    }

    #[test]
    fn test_element_from_wire() {
        let json = r#"{
            "id": "e1",
            "element_type": "TEXT",
            "pos_x": 10,
            "pos_y": 20,
            "width": 300,
            "height": 80,
            "content": "Hello",
            "font_size": 32
        }"#;

        let element: Element = serde_json::from_str(json).unwrap();
        assert_eq!(element.id, ElementId::new("e1"));
        assert_eq!(element.frame.pos_x, 10.0);
        assert_eq!(
            element.kind,
            ElementKind::Text {
                content: "Hello".to_string(),
                font_size: 32
            }
        );
    }

    #[test]
    fn test_media_element_wire_shape() {
        let element = Element {
            id: ElementId::new("e2"),
            frame: Frame::default(),
            kind: ElementKind::Image {
                url: "https://cdn.example.com/cat.png".to_string(),
            },
        };

        let value = serde_json::to_value(&element).unwrap();
        assert_eq!(value["element_type"], "IMAGE");
        assert_eq!(value["content"], "https://cdn.example.com/cat.png");
        assert!(value.get("font_size").is_none());
    }

    #[test]
    fn test_legacy_video_tag() {
        let json = r#"{"id":"v","element_type":"VIDEO","pos_x":0,"pos_y":0,"width":1,"height":1,"content":null}"#;
        let element: Element = serde_json::from_str(json).unwrap();
        assert_eq!(element.element_type(), ElementType::UploadedVideo);
        assert_eq!(element.kind.content(), "");
    }

    #[test]
    fn test_apply_patch_text() {
        let mut element = NewElement::text("Before").build(ElementId::new("e")).unwrap();
        element.apply_patch(&ElementPatch {
            pos_x: Some(5.0),
            content: Some("After".to_string()),
            font_size: Some(40),
            ..ElementPatch::default()
        });

        assert_eq!(element.frame.pos_x, 5.0);
        assert_eq!(element.frame.pos_y, 100.0);
        assert_eq!(
            element.kind,
            ElementKind::Text {
                content: "After".to_string(),
                font_size: 40
            }
        );
    }

    #[test]
    fn test_apply_patch_ignores_font_size_on_media() {
        let mut element = NewElement::media(ElementType::Image, "a.png")
            .build(ElementId::new("e"))
            .unwrap();
        let mut patch = ElementPatch::content("b.png");
        patch.font_size = Some(12);
        element.apply_patch(&patch);

        assert_eq!(
            element.kind,
            ElementKind::Image {
                url: "b.png".to_string()
            }
        );
    }

    #[test]
    fn test_new_element_defaults() {
        let element = NewElement {
            element_type: ElementType::Text,
            content: None,
            frame: None,
        }
        .build(ElementId::new("e"))
        .unwrap();

        assert_eq!(element.frame, Frame::default());
        assert_eq!(element.kind.content(), DEFAULT_TEXT);
        assert!(matches!(
            element.kind,
            ElementKind::Text { font_size: DEFAULT_FONT_SIZE, .. }
        ));
    }

    #[test]
    fn test_media_requires_url() {
        let missing = NewElement {
            element_type: ElementType::UploadedVideo,
            content: None,
            frame: None,
        };
        assert!(missing.build(ElementId::new("e")).is_none());

        let blank = NewElement::media(ElementType::Image, "  ");
        assert!(blank.build(ElementId::new("e")).is_none());
    }

    #[test]
    fn test_new_element_request_body() {
        let request = NewElement::text("Hi").with_frame(Frame {
            pos_x: 1.0,
            pos_y: 2.0,
            width: 3.0,
            height: 4.0,
        });
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["element_type"], "TEXT");
        assert_eq!(value["content"], "Hi");
        assert_eq!(value["pos_x"], 1.0);
        assert_eq!(value["height"], 4.0);
    }

    #[test]
    fn test_slide_defaults_from_sparse_response() {
        // Slide creation responses omit colour and elements
        let json = r#"{"id": 7, "title": "New slide", "content": null, "slide_number": 3}"#;
        let slide: Slide = serde_json::from_str(json).unwrap();
        assert_eq!(slide.id, SlideId::new("7"));
        assert_eq!(slide.slide_number, 3);
        assert_eq!(slide.background_color, DEFAULT_BACKGROUND);
        assert!(slide.elements.is_empty());
    }

    #[test]
    fn test_renumber_slides() {
        let mut p = Presentation::new(PresentationId::new("p"), "Deck");
        p.slides = vec![
            Slide::new(SlideId::new("a")),
            Slide::new(SlideId::new("b")),
            Slide::new(SlideId::new("c")),
        ];
        p.slides[1].slide_number = 9;
        p.renumber_slides();

        let numbers: Vec<u32> = p.slides.iter().map(|s| s.slide_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_find_element() {
        let mut p = Presentation::new(PresentationId::new("p"), "Deck");
        let mut slide = Slide::new(SlideId::new("s2"));
        slide
            .elements
            .push(NewElement::text("x").build(ElementId::new("e9")).unwrap());
        p.slides = vec![Slide::new(SlideId::new("s1")), slide];

        let (slide, element) = p.find_element(&ElementId::new("e9")).unwrap();
        assert_eq!(slide.id, SlideId::new("s2"));
        assert_eq!(element.kind.content(), "x");
        assert!(p.find_element(&ElementId::new("nope")).is_none());
    }

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#FFFFFF"));
        assert!(is_hex_color("#1a2B3c"));
        assert!(!is_hex_color("FFFFFF"));
        assert!(!is_hex_color("#FFF"));
        assert!(!is_hex_color("#GGGGGG"));
    }

    #[test]
    fn test_youtube_video_id() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            youtube_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            youtube_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            youtube_video_id("https://www.youtube.com/shorts/abc_DEF-123"),
            Some("abc_DEF-123")
        );
        assert_eq!(youtube_video_id("https://example.com/video.mp4"), None);
        assert_eq!(youtube_video_id("https://example.com/watch?v=abc"), None);
    }

    #[test]
    fn test_thumbnail_url() {
        let kind = ElementKind::YoutubeVideo {
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
        };
        assert_eq!(
            kind.thumbnail_url().as_deref(),
            Some("https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
        );

        let image = ElementKind::Image {
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
        };
        assert!(image.thumbnail_url().is_none());
    }

    #[test]
    fn test_presentation_summary_naive_timestamp() {
        let json = r#"{"id":"p1","title":"Deck","updated_at":"2024-05-01T09:30:00.123456"}"#;
        let summary: PresentationSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.title, "Deck");
        assert!(summary.updated_at.is_some());
    }
}
