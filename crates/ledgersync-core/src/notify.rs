//! Outbound notifications
//!
//! Every operation reports its outcome on a side channel for whatever
//! surface shows toasts or drives navigation. Notifications are
//! observations, never control flow: callers act on return values.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::model::Session;

/// Events emitted by the synchronization layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// An operation succeeded
    Success { message: String },

    /// An operation failed
    Failure { message: String },

    /// OTP verified; the authenticated landing view should be shown
    Authenticated { session: Session },

    /// The session ended (logout or unusable persisted record);
    /// the sign-in view should be shown
    SessionExpired,
}

/// Non-blocking sender for [`SyncEvent`]s
///
/// Cheap to clone; every component of a context shares one.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Option<mpsc::Sender<SyncEvent>>,
}

impl Notifier {
    /// Create a notifier and the receiving end of its bounded channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SyncEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A notifier that discards everything
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(SyncEvent::Success {
            message: message.into(),
        });
    }

    pub fn failure(&self, message: impl Into<String>) {
        self.emit(SyncEvent::Failure {
            message: message.into(),
        });
    }

    /// Emit an event without waiting
    ///
    /// A full channel drops the event with a warning; a dropped receiver
    /// means nobody is listening and is ignored.
    pub fn emit(&self, event: SyncEvent) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    "Notification channel full, dropping {:?}. Consider increasing event_channel_capacity.",
                    event
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::trace!("Notification receiver dropped");
            }
        }
    }
}
