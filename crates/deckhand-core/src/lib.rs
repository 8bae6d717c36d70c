//! Deckhand Core Library
//!
//! This crate provides the document state synchronisation engine behind
//! Deckhand, a slide-deck editor whose documents live on a remote
//! persistence service.
//!
//! # Architecture
//!
//! - **DocumentStore**: owns the presentation tree and the selection; every
//!   change is applied locally first and published to observers
//! - **SyncEngine**: mirrors each change to the service and commits or rolls
//!   back when the call resolves
//! - **Gateway**: the request/response contract to the service
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = DocumentStore::new().into_shared();
//! let gateway = Arc::new(HttpGateway::from_config(&config)?);
//! let engine = SyncEngine::new(&store, gateway, Arc::new(LogNotifier));
//!
//! engine.load(&presentation_id).await;
//! engine.add_slide().await;
//! ```
//!
//! # Modules
//!
//! - `model`: Presentations, slides, elements and patches
//! - `selection`: Active slide / element tracking
//! - `store`: In-memory document store with snapshots
//! - `gateway`: Persistence service contract and adapters
//! - `notify`: User-facing notifications
//! - `sync`: Optimistic sync engine
//! - `config`: Application configuration

pub mod config;
pub mod gateway;
pub mod model;
pub mod notify;
pub mod selection;
pub mod store;
pub mod sync;

pub use config::Config;
pub use gateway::{
    Gateway, GatewayCall, GatewayError, GatewayResult, HttpGateway, MediaUpload, MemoryGateway,
};
pub use model::{
    Element, ElementId, ElementKind, ElementPatch, ElementType, Frame, NewElement, Presentation,
    PresentationId, PresentationSummary, Slide, SlideId, SlidePatch,
};
pub use notify::{ChannelNotifier, LogNotifier, Notification, Notifier, Severity};
pub use selection::Selection;
pub use store::{DocumentStore, DocumentView, SharedStore, Snapshot, StoreError};
pub use sync::{Operation, SyncEngine, SyncError, SyncOutcome};
