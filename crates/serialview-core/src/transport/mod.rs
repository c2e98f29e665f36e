//! Serial transport
//!
//! [`SerialTransport`] is the caller-side handle. Every operation only enqueues a
//! command for the dedicated I/O worker and returns immediately; outcomes arrive
//! later as [`TerminalEvent`](crate::events::TerminalEvent)s.

pub mod device;
pub mod ports;
mod worker;

use serde::{Deserialize, Serialize};
use std::io;
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::watch;

pub use device::{DeviceOpener, SerialDevice, SerialPortDevice, SystemOpener};
pub use ports::{list_ports, PortInfo};

use crate::config::SerialLinkConfig;
use crate::error::{RuntimeErrorKind, TerminalError};
use crate::events::{emit, EventSender};
use worker::{Worker, WorkerCommand};

/// Transport lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    /// No device held
    #[default]
    Closed,
    /// Open attempt in progress
    Opening,
    /// Device open and being polled
    Open,
    /// Releasing the device
    Closing,
    /// Device lost; the close sequence follows immediately
    Faulted,
}

/// Handle to the serial I/O worker
pub struct SerialTransport {
    commands: std_mpsc::Sender<WorkerCommand>,
    state: watch::Receiver<TransportState>,
    events: EventSender,
    worker: Option<JoinHandle<()>>,
}

impl SerialTransport {
    /// Transport over real serial ports
    pub fn new(events: EventSender) -> io::Result<Self> {
        Self::with_opener(SystemOpener, events)
    }

    /// Transport using a custom device opener
    pub fn with_opener<O: DeviceOpener>(opener: O, events: EventSender) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = std_mpsc::channel();
        let (state_tx, state_rx) = watch::channel(TransportState::Closed);

        let worker = Worker::new(opener, events.clone(), state_tx);
        let handle = std::thread::Builder::new()
            .name("serialview-io".to_string())
            .spawn(move || worker.run(cmd_rx))?;

        Ok(Self {
            commands: cmd_tx,
            state: state_rx,
            events,
            worker: Some(handle),
        })
    }

    fn dispatch(&self, command: WorkerCommand) {
        if self.commands.send(command).is_err() {
            emit(
                &self.events,
                TerminalError::Runtime {
                    kind: RuntimeErrorKind::ResourceError,
                    message: "Serial I/O worker has exited".to_string(),
                }
                .into(),
            );
        }
    }

    /// Validate `config` and schedule the open
    ///
    /// An invalid configuration is returned synchronously and nothing is
    /// scheduled. A start while a session is active is rejected by the worker
    /// with an `AlreadyRunning` error event.
    pub fn start(&self, config: SerialLinkConfig) -> Result<(), TerminalError> {
        config.validate()?;
        self.dispatch(WorkerCommand::Open(config));
        Ok(())
    }

    /// Schedule a close. Always accepted; always answered with `Stopped`.
    pub fn stop(&self) {
        self.dispatch(WorkerCommand::Close);
    }

    /// Schedule one write attempt
    pub fn send(&self, bytes: Vec<u8>) {
        self.dispatch(WorkerCommand::Send(bytes));
    }

    /// Last state published by the worker
    pub fn state(&self) -> TransportState {
        *self.state.borrow()
    }

    /// Whether the worker reports [`TransportState::Open`]
    pub fn is_open(&self) -> bool {
        self.state() == TransportState::Open
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        let _ = self.commands.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("serial worker panicked");
            }
        }
    }
}
