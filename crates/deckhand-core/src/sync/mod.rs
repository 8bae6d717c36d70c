//! Optimistic synchronisation with the persistence service
//!
//! Every document operation follows the same protocol:
//! 1. Snapshot the store
//! 2. Apply the change locally (observers see it at once)
//! 3. Call the gateway without holding the store lock
//! 4. On success merge any server-assigned data; on failure restore the
//!    snapshot and notify the user once
//!
//! Add operations insert a placeholder entity under a `tmp-` id that is
//! swapped for the server's entity on success and removed on failure.
//!
//! ## Ordering
//!
//! Operations are not queued. Two operations in flight at the same time
//! each snapshot the state they started from, so a rollback of the first
//! can undo the optimistic effect of the second.
//!
//! ## Usage
//!
//! ```ignore
//! let store = DocumentStore::new().into_shared();
//! let engine = SyncEngine::new(&store, gateway, notifier);
//! engine.load(&presentation_id).await;
//! if !engine.delete_slide(&slide_id).await.is_committed() {
//!     // already rolled back and reported
//! }
//! ```

mod engine;
mod operation;
mod outcome;

pub use engine::SyncEngine;
pub use operation::Operation;
pub use outcome::{SyncError, SyncOutcome};
