//! # serialview Core Library
//!
//! Acquisition-and-display pipeline for a serial-line terminal.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - A serial transport whose device I/O runs on a dedicated worker
//! - A bounded, newest-wins ring buffer for retained raw bytes
//! - Text and hex formatting of received bytes
//! - A once-per-second throughput counter
//! - A fixed-cadence refresh scheduler that batches display updates
//!
//! ## Example
//!
//! ```rust,ignore
//! use serialview_core::prelude::*;
//!
//! let (events_tx, mut events) = event_channel();
//! let session = TerminalSession::new(TextDisplay::default(), events_tx, SessionOptions::default())?;
//! let (commands, rx) = command_channel();
//! tokio::spawn(session.run(rx));
//!
//! commands.send(Command::Open(SerialLinkConfig::new("/dev/ttyUSB0", 115200)))?;
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod highlight;
pub mod refresh;
pub mod send;
pub mod session;
pub mod throughput;
pub mod transport;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::buffer::RingBuffer;
    pub use crate::config::{
        Codec, DataBits, DisplayMode, FormatterConfig, Parity, SerialLinkConfig, StopBits,
        TerminalPreferences,
    };
    pub use crate::error::{ErrorKind, TerminalError};
    pub use crate::events::{event_channel, TerminalEvent};
    pub use crate::format::FrameFormatter;
    pub use crate::refresh::{DisplaySink, RefreshScheduler, TextDisplay};
    pub use crate::send::SendOptions;
    pub use crate::session::{command_channel, Command, SessionOptions, TerminalSession};
    pub use crate::throughput::ThroughputMonitor;
    pub use crate::transport::{list_ports, SerialTransport, TransportState};
}

/// Default baud rate for new links
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default read slice size
pub const DEFAULT_READ_CHUNK: usize = 4096;

/// Default ring buffer capacity in bytes
pub const DEFAULT_RING_CAPACITY: usize = 65536;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
