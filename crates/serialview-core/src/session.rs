//! Acquisition-and-display pipeline
//!
//! [`TerminalSession`] wires the transport to the ring buffer, formatter,
//! throughput monitor and refresh scheduler, and exposes the command surface the
//! collaborator drives. It runs on the consumer's async task; only the transport
//! worker lives elsewhere.

use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::buffer::RingBuffer;
use crate::config::{Codec, DisplayMode, FormatterConfig, SerialLinkConfig, TerminalPreferences};
use crate::events::{emit, event_channel, EventReceiver, EventSender, TerminalEvent};
use crate::format::FrameFormatter;
use crate::refresh::{DisplaySink, RefreshScheduler};
use crate::send::{compose, SendOptions};
use crate::throughput::{ThroughputMonitor, ThroughputState};
use crate::transport::{DeviceOpener, SerialTransport, SystemOpener, TransportState};
use crate::DEFAULT_RING_CAPACITY;

/// How long shutdown waits for the worker to confirm the close
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Commands accepted from the collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Validate and open a link
    Open(SerialLinkConfig),
    /// Close the link
    Close,
    /// Write raw bytes
    Send(Vec<u8>),
    /// Encode with the current [`SendOptions`], then send
    SendText(String),
    /// Text or hex display for subsequent reads
    SetFormatMode(DisplayMode),
    /// Timestamp prefix for subsequent reads
    SetTimestampEnabled(bool),
    /// Text-mode decoder for subsequent reads
    SetEncoding(Codec),
    /// Hex CR/LF line breaking for subsequent reads
    SetHexNewlineSplitting(bool),
    /// Encoding used by [`Command::SendText`]
    SetSendOptions(SendOptions),
    /// Empty retained bytes, pending text and the display; reset throughput
    Clear,
    /// The user moved the view
    UserScrolled {
        /// Current scroll offset
        offset: u32,
        /// Largest possible offset
        maximum: u32,
    },
}

/// Sending half of a command stream
pub type CommandSender = mpsc::UnboundedSender<Command>;
/// Receiving half of a command stream
pub type CommandReceiver = mpsc::UnboundedReceiver<Command>;

/// Create a command stream
pub fn command_channel() -> (CommandSender, CommandReceiver) {
    mpsc::unbounded_channel()
}

/// Construction options
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Ring buffer size in bytes
    pub ring_capacity: usize,
    /// Initial formatter settings
    pub formatter: FormatterConfig,
    /// Initial send settings
    pub send: SendOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            ring_capacity: DEFAULT_RING_CAPACITY,
            formatter: FormatterConfig::default(),
            send: SendOptions::default(),
        }
    }
}

impl From<&TerminalPreferences> for SessionOptions {
    fn from(prefs: &TerminalPreferences) -> Self {
        Self {
            ring_capacity: DEFAULT_RING_CAPACITY,
            formatter: prefs.formatter_config(),
            send: prefs.send_options(),
        }
    }
}

/// One terminal: transport plus display pipeline
pub struct TerminalSession<D: DisplaySink + 'static> {
    transport: SerialTransport,
    transport_events: EventReceiver,
    outward: EventSender,
    buffer: Arc<RingBuffer>,
    formatter: FrameFormatter,
    send_options: SendOptions,
    monitor: ThroughputMonitor,
    scheduler: RefreshScheduler<D>,
}

impl<D: DisplaySink + 'static> TerminalSession<D> {
    /// Session over real serial ports
    pub fn new(sink: D, outward: EventSender, options: SessionOptions) -> io::Result<Self> {
        Self::with_opener(SystemOpener, sink, outward, options)
    }

    /// Session using a custom device opener
    pub fn with_opener<O: DeviceOpener>(
        opener: O,
        sink: D,
        outward: EventSender,
        options: SessionOptions,
    ) -> io::Result<Self> {
        let (tx, rx) = event_channel();
        Ok(Self {
            transport: SerialTransport::with_opener(opener, tx)?,
            transport_events: rx,
            outward,
            buffer: Arc::new(RingBuffer::new(options.ring_capacity)),
            formatter: FrameFormatter::new(options.formatter),
            send_options: options.send,
            monitor: ThroughputMonitor::new(),
            scheduler: RefreshScheduler::new(sink),
        })
    }

    /// Transport state as last published by the worker
    pub fn state(&self) -> TransportState {
        self.transport.state()
    }

    /// Settings for the next formatted read
    pub fn formatter_config(&self) -> &FormatterConfig {
        self.formatter.config()
    }

    /// Settings used by [`Command::SendText`]
    pub fn send_options(&self) -> SendOptions {
        self.send_options
    }

    /// Shared handle to the retained raw bytes
    pub fn buffer(&self) -> Arc<RingBuffer> {
        self.buffer.clone()
    }

    /// Take the retained raw bytes, emptying the ring buffer
    pub fn drain_history(&self) -> Vec<u8> {
        self.buffer.read_all()
    }

    /// Current throughput counters
    pub fn throughput(&self) -> ThroughputState {
        self.monitor.snapshot()
    }

    /// The display refresh scheduler
    pub fn scheduler(&self) -> &RefreshScheduler<D> {
        &self.scheduler
    }

    /// Apply one collaborator command
    pub fn handle_command(&mut self, command: Command) {
        match command {
            Command::Open(config) => {
                if let Err(err) = self.transport.start(config) {
                    tracing::warn!(error = %err, "rejected link configuration");
                    emit(&self.outward, err.into());
                }
            }
            Command::Close => self.transport.stop(),
            Command::Send(bytes) => self.transport.send(bytes),
            Command::SendText(text) => match compose(&text, self.send_options) {
                Ok(bytes) if bytes.is_empty() => {}
                Ok(bytes) => self.transport.send(bytes),
                Err(err) => emit(&self.outward, err.into()),
            },
            Command::SetFormatMode(mode) => self.formatter.set_mode(mode),
            Command::SetTimestampEnabled(enabled) => self.formatter.set_timestamp_enabled(enabled),
            Command::SetEncoding(codec) => self.formatter.set_codec(codec),
            Command::SetHexNewlineSplitting(enabled) => {
                self.formatter.set_hex_newline_splitting(enabled)
            }
            Command::SetSendOptions(options) => self.send_options = options,
            Command::Clear => {
                self.buffer.clear();
                self.scheduler.clear();
                self.monitor.reset();
            }
            Command::UserScrolled { offset, maximum } => {
                self.scheduler.on_user_scroll(offset, maximum)
            }
        }
    }

    /// React to one transport event, then forward it
    pub fn handle_transport_event(&mut self, event: TerminalEvent) {
        match event {
            TerminalEvent::Opened => {
                self.monitor.reset();
                self.monitor.start(self.outward.clone());
                self.scheduler.start();
                emit(&self.outward, TerminalEvent::Opened);
            }
            TerminalEvent::BytesReceived(raw) => {
                self.buffer.write(&raw);
                self.monitor.record_bytes(raw.len() as i64);
                let text = self.formatter.process(&raw);
                emit(&self.outward, TerminalEvent::BytesReceived(raw));
                if !text.is_empty() {
                    self.scheduler.push(&text);
                    emit(&self.outward, TerminalEvent::FormattedTextReady(text));
                }
            }
            TerminalEvent::Stopped => {
                self.scheduler.stop();
                self.monitor.stop();
                emit(&self.outward, TerminalEvent::Stopped);
            }
            other => emit(&self.outward, other),
        }
    }

    /// Drive the session until the command channel closes
    pub async fn run(mut self, mut commands: CommandReceiver) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                event = self.transport_events.recv() => match event {
                    Some(event) => self.handle_transport_event(event),
                    None => break,
                },
            }
        }
        self.shutdown().await;
    }

    /// Close the device and wait briefly for the worker to confirm
    pub async fn shutdown(&mut self) {
        self.transport.stop();
        let wait = async {
            while let Some(event) = self.transport_events.recv().await {
                let stopped = event == TerminalEvent::Stopped;
                self.handle_transport_event(event);
                if stopped {
                    break;
                }
            }
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, wait).await.is_err() {
            tracing::warn!("serial worker did not confirm close");
            self.scheduler.stop();
            self.monitor.stop();
        }
    }
}
