//! User-facing notifications
//!
//! The sync engine reports outcomes through a [`Notifier`]. Delivery is
//! fire-and-forget: a notifier must never block or fail the caller.

use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// Sink for transient user messages
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Forwards notifications into an unbounded channel
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Notification>>>,
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelNotifier {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Take the receiving end; only the first call gets it
    pub fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<Notification>> {
        self.rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        // Receiver dropped: nobody is listening any more
        let _ = self.tx.send(Notification::new(message, severity));
    }
}

/// Writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Error => error!("{}", message),
            Severity::Success | Severity::Info => info!("{}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_notifier_delivers_in_order() {
        let notifier = ChannelNotifier::new();
        let mut rx = notifier.take_receiver().unwrap();
        assert!(notifier.take_receiver().is_none());

        notifier.notify("Slide added", Severity::Success);
        notifier.notify("Could not delete slide", Severity::Error);

        assert_eq!(
            rx.try_recv().unwrap(),
            Notification::new("Slide added", Severity::Success)
        );
        assert_eq!(rx.try_recv().unwrap().severity, Severity::Error);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_notify_without_receiver_is_silent() {
        let notifier = ChannelNotifier::new();
        drop(notifier.take_receiver());
        notifier.notify("ignored", Severity::Info);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&Notification::new("ok", Severity::Success)).unwrap();
        assert_eq!(json, r#"{"message":"ok","severity":"success"}"#);
    }
}
