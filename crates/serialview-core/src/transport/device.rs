//! Device seam
//!
//! The worker talks to a [`SerialDevice`] obtained from a [`DeviceOpener`]. The
//! system opener wraps the `serialport` crate; tests supply in-memory devices.

use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;

use crate::config::SerialLinkConfig;
use crate::error::{OpenErrorKind, RuntimeErrorKind, TerminalError};

/// Upper bound for a single OS read or write call
const IO_TIMEOUT: Duration = Duration::from_millis(100);

/// An open byte device
pub trait SerialDevice: Send {
    /// Bytes that can be read without blocking
    fn bytes_to_read(&mut self) -> io::Result<usize>;

    /// Read up to `buf.len()` bytes
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// One write attempt; may write fewer bytes than given
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
}

/// Opens devices for the worker
pub trait DeviceOpener: Send + 'static {
    /// Open and configure the device named by `config`
    fn open(&mut self, config: &SerialLinkConfig) -> Result<Box<dyn SerialDevice>, TerminalError>;
}

/// `serialport`-backed device
pub struct SerialPortDevice {
    port: Box<dyn SerialPort>,
}

impl SerialPortDevice {
    /// Wrap an open port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl SerialDevice for SerialPortDevice {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        self.port
            .bytes_to_read()
            .map(|n| n as usize)
            .map_err(io::Error::from)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.port.write(data)
    }
}

/// Opens real serial ports
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl DeviceOpener for SystemOpener {
    fn open(&mut self, config: &SerialLinkConfig) -> Result<Box<dyn SerialDevice>, TerminalError> {
        let stop_bits = config.stop_bits.to_serialport().ok_or_else(|| TerminalError::Open {
            kind: OpenErrorKind::GenericOpenFailure,
            message: format!(
                "Failed to open port {}: {} stop bits not supported on this platform",
                config.port_identifier, config.stop_bits
            ),
        })?;

        let port = serialport::new(&config.port_identifier, config.baud_rate)
            .data_bits(config.data_bits.into())
            .stop_bits(stop_bits)
            .parity(config.parity.into())
            .flow_control(config.flow_control.into())
            .timeout(IO_TIMEOUT)
            .open()
            .map_err(|e| classify_open_error(&config.port_identifier, e))?;

        Ok(Box::new(SerialPortDevice::new(port)))
    }
}

/// Map an open failure onto the OpenError sub-kinds
pub fn classify_open_error(port: &str, err: serialport::Error) -> TerminalError {
    let kind = match err.kind() {
        serialport::ErrorKind::NoDevice => OpenErrorKind::DeviceNotFound,
        serialport::ErrorKind::Io(io::ErrorKind::NotFound) => OpenErrorKind::DeviceNotFound,
        serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
            OpenErrorKind::PermissionDenied
        }
        _ => OpenErrorKind::GenericOpenFailure,
    };
    let message = match kind {
        OpenErrorKind::DeviceNotFound => format!("Device not found: {} ({})", port, err),
        OpenErrorKind::PermissionDenied => format!("Permission denied: {} ({})", port, err),
        OpenErrorKind::GenericOpenFailure => format!("Failed to open port {}: {}", port, err),
    };
    TerminalError::Open { kind, message }
}

/// Whether an I/O error means the device itself is gone
pub fn is_resource_loss(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::NotFound
            | io::ErrorKind::PermissionDenied
    )
}

/// Map a read-side failure onto the RuntimeError sub-kinds
pub fn classify_read_error(err: &io::Error) -> TerminalError {
    if err.kind() == io::ErrorKind::TimedOut {
        return TerminalError::Runtime {
            kind: RuntimeErrorKind::Timeout,
            message: "Timeout error".to_string(),
        };
    }
    if is_resource_loss(err) {
        return resource_error(err);
    }
    TerminalError::Runtime {
        kind: RuntimeErrorKind::ReadError,
        message: format!("Read error: {}", err),
    }
}

/// RuntimeError for a device that went away
pub fn resource_error(err: &io::Error) -> TerminalError {
    TerminalError::Runtime {
        kind: RuntimeErrorKind::ResourceError,
        message: format!(
            "Resource error (device may have been disconnected): {}",
            err
        ),
    }
}
