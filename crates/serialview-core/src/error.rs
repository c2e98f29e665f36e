//! Terminal errors
//!
//! Every failure the pipeline can produce is one of four classes: validation
//! (hardware never touched), open, runtime and logic. All of them travel to the
//! collaborator as `error(message, kind)` events; none are fatal.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why opening a device failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenErrorKind {
    /// The named device does not exist
    DeviceNotFound,
    /// The process may not open the device
    PermissionDenied,
    /// Any other failure while opening or configuring
    GenericOpenFailure,
}

/// Failures detected while a session is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeErrorKind {
    /// A read failed; the session stays open
    ReadError,
    /// A write failed outright
    WriteError,
    /// A write stored fewer bytes than requested
    IncompleteWrite,
    /// Device vanished (unplugged, driver reset). Closes the session.
    ResourceError,
    /// The OS read primitive timed out
    Timeout,
}

/// Flat error classification carried by `error` events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Malformed configuration
    #[serde(rename = "validation-error")]
    Validation,
    /// See [`OpenErrorKind::DeviceNotFound`]
    DeviceNotFound,
    /// See [`OpenErrorKind::PermissionDenied`]
    PermissionDenied,
    /// See [`OpenErrorKind::GenericOpenFailure`]
    #[serde(rename = "generic-open-failure")]
    OpenFailed,
    /// See [`RuntimeErrorKind::ReadError`]
    ReadError,
    /// See [`RuntimeErrorKind::WriteError`]
    WriteError,
    /// See [`RuntimeErrorKind::IncompleteWrite`]
    IncompleteWrite,
    /// See [`RuntimeErrorKind::ResourceError`]
    ResourceError,
    /// See [`RuntimeErrorKind::Timeout`]
    Timeout,
    /// See [`LogicErrorKind::AlreadyRunning`]
    AlreadyRunning,
    /// See [`LogicErrorKind::NotOpen`]
    NotOpen,
}

impl ErrorKind {
    /// Whether this kind belongs to the LogicError class
    pub fn is_logic(self) -> bool {
        matches!(self, ErrorKind::AlreadyRunning | ErrorKind::NotOpen)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation-error",
            ErrorKind::DeviceNotFound => "device-not-found",
            ErrorKind::PermissionDenied => "permission-denied",
            ErrorKind::OpenFailed => "generic-open-failure",
            ErrorKind::ReadError => "read-error",
            ErrorKind::WriteError => "write-error",
            ErrorKind::IncompleteWrite => "incomplete-write",
            ErrorKind::ResourceError => "resource-error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::AlreadyRunning => "already-running",
            ErrorKind::NotOpen => "not-open",
        };
        f.write_str(s)
    }
}

/// Logic errors: commands that are rejected without touching the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicErrorKind {
    /// Start requested while a session is active
    AlreadyRunning,
    /// Send requested with no open session
    NotOpen,
}

/// Errors produced by the terminal pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TerminalError {
    /// Configuration rejected before any hardware access
    #[error("{0}")]
    Validation(String),

    /// Opening the device failed
    #[error("{message}")]
    Open {
        /// Failure class
        kind: OpenErrorKind,
        /// Human-readable detail
        message: String,
    },

    /// I/O failure while the session is open
    #[error("{message}")]
    Runtime {
        /// Failure class
        kind: RuntimeErrorKind,
        /// Human-readable detail
        message: String,
    },

    /// Command not valid in the current state
    #[error("{message}")]
    Logic {
        /// Failure class
        kind: LogicErrorKind,
        /// Human-readable detail
        message: String,
    },
}

impl TerminalError {
    /// Start while a session is active
    pub fn already_running() -> Self {
        TerminalError::Logic {
            kind: LogicErrorKind::AlreadyRunning,
            message: "Serial port is already running".to_string(),
        }
    }

    /// Send with no open session
    pub fn not_open() -> Self {
        TerminalError::Logic {
            kind: LogicErrorKind::NotOpen,
            message: "Serial port is not open".to_string(),
        }
    }

    /// Flat classification used on the event surface
    pub fn kind(&self) -> ErrorKind {
        match self {
            TerminalError::Validation(_) => ErrorKind::Validation,
            TerminalError::Open { kind, .. } => match kind {
                OpenErrorKind::DeviceNotFound => ErrorKind::DeviceNotFound,
                OpenErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
                OpenErrorKind::GenericOpenFailure => ErrorKind::OpenFailed,
            },
            TerminalError::Runtime { kind, .. } => match kind {
                RuntimeErrorKind::ReadError => ErrorKind::ReadError,
                RuntimeErrorKind::WriteError => ErrorKind::WriteError,
                RuntimeErrorKind::IncompleteWrite => ErrorKind::IncompleteWrite,
                RuntimeErrorKind::ResourceError => ErrorKind::ResourceError,
                RuntimeErrorKind::Timeout => ErrorKind::Timeout,
            },
            TerminalError::Logic { kind, .. } => match kind {
                LogicErrorKind::AlreadyRunning => ErrorKind::AlreadyRunning,
                LogicErrorKind::NotOpen => ErrorKind::NotOpen,
            },
        }
    }
}
