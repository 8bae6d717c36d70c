//! Results of sync operations

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::model::{ElementId, SlideId};
use crate::store::StoreError;

/// Why an operation did not commit
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The entity only exists locally until its add completes
    #[error("{0} is still being saved")]
    Unsaved(String),

    #[error("Title cannot be empty")]
    BlankTitle,

    #[error("Invalid colour: {0} (expected #RRGGBB)")]
    InvalidColor(String),

    #[error("Nothing to update")]
    EmptyPatch,

    #[error("Media elements need a URL")]
    MissingMediaUrl,

    /// The server reported success without the data we need
    #[error("Incomplete response from server: {0}")]
    PartialData(String),
}

impl SyncError {
    pub(crate) fn unsaved_slide(id: &SlideId) -> Self {
        SyncError::Unsaved(format!("Slide {}", id))
    }

    pub(crate) fn unsaved_element(id: &ElementId) -> Self {
        SyncError::Unsaved(format!("Element {}", id))
    }
}

/// How an operation ended
///
/// Failures are already absorbed by the engine (rolled back and reported
/// to the notifier); the outcome is informational.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The server confirmed the change and the store reflects it
    Committed,
    /// The gateway call failed; the optimistic change was undone
    RolledBack(SyncError),
    /// A local precondition failed; nothing changed and no call was made
    Rejected(SyncError),
    /// The store was dropped; the result was discarded
    Detached,
}

impl SyncOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, SyncOutcome::Committed)
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            SyncOutcome::RolledBack(e) | SyncOutcome::Rejected(e) => Some(e),
            SyncOutcome::Committed | SyncOutcome::Detached => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_error() {
        assert!(SyncOutcome::Committed.is_committed());
        assert!(SyncOutcome::Detached.error().is_none());

        let rejected = SyncOutcome::Rejected(SyncError::BlankTitle);
        assert!(!rejected.is_committed());
        assert_eq!(rejected.error(), Some(&SyncError::BlankTitle));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            SyncError::unsaved_slide(&SlideId::new("tmp-1")).to_string(),
            "Slide tmp-1 is still being saved"
        );
        assert_eq!(
            SyncError::from(StoreError::NotLoaded).to_string(),
            "No presentation is loaded"
        );
    }
}
