//! Events delivered to the collaborator

use tokio::sync::mpsc;

use crate::error::{ErrorKind, TerminalError};

/// Everything the pipeline reports outward
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// Device opened, session running
    Opened,
    /// Session ended; the transport is Closed again
    Stopped,
    /// One device-ready read, in device order
    BytesReceived(Vec<u8>),
    /// A classified failure
    Error {
        /// Human-readable detail
        message: String,
        /// Failure class
        kind: ErrorKind,
    },
    /// Display text for one `BytesReceived`
    FormattedTextReady(String),
    /// Bytes seen in the last second and since the counters were reset
    ThroughputSample {
        /// Bytes in the last sampling interval
        interval_bytes: u64,
        /// Bytes since the counters were reset
        total_bytes: u64,
    },
}

impl From<TerminalError> for TerminalEvent {
    fn from(err: TerminalError) -> Self {
        TerminalEvent::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Sending half of an event stream
pub type EventSender = mpsc::UnboundedSender<TerminalEvent>;

/// Receiving half of an event stream
pub type EventReceiver = mpsc::UnboundedReceiver<TerminalEvent>;

/// Create an event stream
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send an event, ignoring a receiver that has gone away
pub(crate) fn emit(tx: &EventSender, event: TerminalEvent) {
    if tx.send(event).is_err() {
        tracing::trace!("event receiver dropped");
    }
}
