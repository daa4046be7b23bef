//! Events for the presentation layer.

use sentinel_store::ChatMessage;
use tokio::sync::mpsc;
use tracing::trace;

use crate::scan::ScanFindings;

/// Something the presentation layer should show.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A message was added to the chat log.
    ChatMessage(ChatMessage),

    /// A running scan reached a new step.
    ScanProgress {
        /// Completed share of the scan, in `[0, 1]`.
        fraction: f32,

        /// Step description.
        label: String,
    },

    /// A scan finished.
    ScanCompleted {
        /// Scan log id.
        scan_id: i64,

        /// What the scanner found.
        findings: ScanFindings,
    },

    /// Connectivity flipped.
    Connectivity {
        /// Whether the device is now online.
        online: bool,
    },

    /// A failure the user should hear about once.
    Notification(String),
}

/// Sending half of the UI event channel.
///
/// Sends never block. Events sent after the receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct UiEvents {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl UiEvents {
    /// Create a connected sender and receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// A sender whose events go nowhere.
    pub fn discard() -> Self {
        Self::channel().0
    }

    /// Send an event.
    pub fn emit(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            trace!("UI event dropped: receiver closed");
        }
    }

    /// Send a notification.
    pub fn notify(&self, message: impl Into<String>) {
        self.emit(UiEvent::Notification(message.into()));
    }
}
