//! The I/O worker
//!
//! Runs on its own thread and exclusively owns the device handle. Commands arrive
//! on a channel; events and state changes leave through the event stream and a
//! watch channel. Device failures are classified here and never escape.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;
use tokio::sync::watch;

use super::device::{classify_read_error, resource_error, DeviceOpener, SerialDevice};
use super::TransportState;
use crate::config::SerialLinkConfig;
use crate::error::{RuntimeErrorKind, TerminalError};
use crate::events::{emit, EventSender, TerminalEvent};

/// Idle wait between device-ready polls
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug)]
pub(crate) enum WorkerCommand {
    Open(SerialLinkConfig),
    Close,
    Send(Vec<u8>),
    Shutdown,
}

struct ActiveDevice {
    device: Box<dyn SerialDevice>,
    port: String,
    chunk: usize,
}

pub(crate) struct Worker<O: DeviceOpener> {
    opener: O,
    events: EventSender,
    state: watch::Sender<TransportState>,
    active: Option<ActiveDevice>,
}

impl<O: DeviceOpener> Worker<O> {
    pub(crate) fn new(
        opener: O,
        events: EventSender,
        state: watch::Sender<TransportState>,
    ) -> Self {
        Self {
            opener,
            events,
            state,
            active: None,
        }
    }

    fn set_state(&self, state: TransportState) {
        self.state.send_replace(state);
    }

    fn current_state(&self) -> TransportState {
        *self.state.borrow()
    }

    fn report(&self, err: TerminalError) {
        emit(&self.events, err.into());
    }

    pub(crate) fn run(mut self, commands: Receiver<WorkerCommand>) {
        tracing::debug!("serial worker started");
        let mut saw_data = false;

        loop {
            let next = if self.active.is_none() {
                commands.recv().map_err(|_| RecvTimeoutError::Disconnected)
            } else if saw_data {
                // Keep draining while the device is busy
                commands.try_recv().map_err(|e| match e {
                    std::sync::mpsc::TryRecvError::Empty => RecvTimeoutError::Timeout,
                    std::sync::mpsc::TryRecvError::Disconnected => {
                        RecvTimeoutError::Disconnected
                    }
                })
            } else {
                commands.recv_timeout(POLL_INTERVAL)
            };

            match next {
                Ok(WorkerCommand::Open(config)) => self.open(config),
                Ok(WorkerCommand::Close) => self.close(),
                Ok(WorkerCommand::Send(data)) => self.write(&data),
                Ok(WorkerCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                    if self.active.is_some() {
                        self.close();
                    }
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            saw_data = self.active.is_some() && self.poll_read();
        }

        tracing::debug!("serial worker exited");
    }

    fn open(&mut self, config: SerialLinkConfig) {
        if self.current_state() != TransportState::Closed {
            tracing::warn!(port = %config.port_identifier, "open requested while running");
            self.report(TerminalError::already_running());
            return;
        }

        self.set_state(TransportState::Opening);
        tracing::info!(
            port = %config.port_identifier,
            baud = config.baud_rate,
            "opening serial port"
        );

        match self.opener.open(&config) {
            Ok(device) => {
                self.active = Some(ActiveDevice {
                    device,
                    port: config.port_identifier,
                    chunk: config.read_chunk_hint.max(1),
                });
                self.set_state(TransportState::Open);
                emit(&self.events, TerminalEvent::Opened);
            }
            Err(err) => {
                tracing::warn!(port = %config.port_identifier, error = %err, "open failed");
                self.set_state(TransportState::Closed);
                self.report(err);
            }
        }
    }

    fn close(&mut self) {
        if let Some(active) = self.active.take() {
            self.set_state(TransportState::Closing);
            // Dropping the handle abandons anything in flight
            drop(active.device);
            tracing::info!(port = %active.port, "serial port closed");
        }
        self.set_state(TransportState::Closed);
        emit(&self.events, TerminalEvent::Stopped);
    }

    /// Device vanished: report, then run the normal close sequence
    fn fault(&mut self, err: TerminalError) {
        self.set_state(TransportState::Faulted);
        tracing::error!(error = %err, "serial device fault");
        self.report(err);
        self.close();
    }

    fn write(&mut self, data: &[u8]) {
        let Some(active) = self.active.as_mut() else {
            self.report(TerminalError::not_open());
            return;
        };
        if data.is_empty() {
            return;
        }

        match active.device.write(data) {
            Ok(n) if n == data.len() => {
                tracing::trace!(bytes = n, "wrote");
            }
            Ok(n) => {
                tracing::warn!(written = n, requested = data.len(), "incomplete write");
                self.report(TerminalError::Runtime {
                    kind: RuntimeErrorKind::IncompleteWrite,
                    message: format!("Incomplete write: {} of {} bytes written", n, data.len()),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "write failed");
                self.report(TerminalError::Runtime {
                    kind: RuntimeErrorKind::WriteError,
                    message: format!("Failed to write data: {}", e),
                });
            }
        }
    }

    /// Read everything currently available as one delivery. Returns whether bytes arrived.
    fn poll_read(&mut self) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };

        let available = match active.device.bytes_to_read() {
            Ok(n) => n,
            Err(e) => {
                let err = resource_error(&e);
                self.fault(err);
                return false;
            }
        };
        if available == 0 {
            return false;
        }

        let mut data = Vec::with_capacity(available);
        let mut chunk = vec![0u8; active.chunk.min(available)];
        let mut failure = None;
        while data.len() < available {
            let want = (available - data.len()).min(chunk.len());
            match active.device.read(&mut chunk[..want]) {
                Ok(0) => break,
                Ok(n) => data.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let got_data = !data.is_empty();
        if got_data {
            emit(&self.events, TerminalEvent::BytesReceived(data));
        }

        if let Some(e) = failure {
            let err = classify_read_error(&e);
            if matches!(
                err,
                TerminalError::Runtime {
                    kind: RuntimeErrorKind::ResourceError,
                    ..
                }
            ) {
                self.fault(err);
            } else {
                tracing::warn!(error = %e, "read failed");
                self.report(err);
            }
        }

        got_data
    }
}
