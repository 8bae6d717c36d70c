//! Gateway error handling
//!
//! Classifies persistence-service failures. The sync engine treats every
//! variant the same way (roll back and notify); the classification exists
//! for logging and for picking a user-facing message.

use thiserror::Error;

/// Errors returned by a persistence gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The entity no longer exists on the server
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server state conflicts with the request
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The server refused the request (validation or business rule)
    #[error("Request rejected ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Rejected { status: u16, message: Option<String> },

    /// Missing or invalid credentials
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Transport failure or server error
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The server answered with something we cannot use
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Classify an HTTP error status, keeping the server's message if it sent one
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let detail = || {
            message
                .clone()
                .unwrap_or_else(|| format!("HTTP status {}", status))
        };
        match status {
            401 | 403 => GatewayError::Unauthorized(detail()),
            404 => GatewayError::NotFound(detail()),
            409 => GatewayError::Conflict(detail()),
            400..=499 => GatewayError::Rejected { status, message },
            _ => GatewayError::Unavailable(detail()),
        }
    }

    /// Message written by the server for the user, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            GatewayError::Rejected { message, .. } => message.as_deref(),
            GatewayError::Conflict(message) => Some(message),
            _ => None,
        }
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            GatewayError::from_status(404, None),
            GatewayError::NotFound(_)
        ));
        assert!(matches!(
            GatewayError::from_status(409, Some("stale".into())),
            GatewayError::Conflict(_)
        ));
        assert!(matches!(
            GatewayError::from_status(403, None),
            GatewayError::Unauthorized(_)
        ));
        assert!(matches!(
            GatewayError::from_status(503, None),
            GatewayError::Unavailable(_)
        ));
        assert_eq!(
            GatewayError::from_status(400, Some("Cannot delete the last slide".into())),
            GatewayError::Rejected {
                status: 400,
                message: Some("Cannot delete the last slide".into())
            }
        );
    }

    #[test]
    fn test_server_message() {
        let rejected = GatewayError::from_status(400, Some("Element type is required".into()));
        assert_eq!(rejected.server_message(), Some("Element type is required"));

        let bare = GatewayError::from_status(422, None);
        assert_eq!(bare.server_message(), None);

        let down = GatewayError::from_status(500, Some("traceback".into()));
        assert_eq!(down.server_message(), None);
    }

    #[test]
    fn test_error_display() {
        let err = GatewayError::from_status(400, None);
        assert_eq!(err.to_string(), "Request rejected (400): no details");

        let err = GatewayError::from_status(404, None);
        assert!(err.to_string().contains("HTTP status 404"));
    }
}
