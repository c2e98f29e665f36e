//! Link, formatter and preference configuration
//!
//! Configuration is an explicit value handed to each component. Nothing in this
//! crate reads settings from a global; the collaborator that persists
//! [`TerminalPreferences`] converts them into the per-component shapes below.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TerminalError;
use crate::send::SendOptions;
use crate::{DEFAULT_BAUD_RATE, DEFAULT_READ_CHUNK};

/// Baud rates accepted by [`SerialLinkConfig::validate`]
pub const SUPPORTED_BAUD_RATES: [u32; 11] = [
    1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600,
];

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    /// 5 data bits
    Five,
    /// 6 data bits
    Six,
    /// 7 data bits
    Seven,
    /// 8 data bits
    #[default]
    Eight,
}

impl TryFrom<u8> for DataBits {
    type Error = TerminalError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(TerminalError::Validation(format!(
                "Invalid data bits: {}. Supported values: 5, 6, 7, 8",
                other
            ))),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> u8 {
        match bits {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StopBits {
    /// 1 stop bit
    #[default]
    #[serde(rename = "1")]
    One,
    /// 1.5 stop bits (no `serialport` equivalent)
    #[serde(rename = "1.5")]
    OnePointFive,
    /// 2 stop bits
    #[serde(rename = "2")]
    Two,
}

impl StopBits {
    /// The `serialport` equivalent. 1.5 stop bits has none.
    pub fn to_serialport(self) -> Option<serialport::StopBits> {
        match self {
            StopBits::One => Some(serialport::StopBits::One),
            StopBits::OnePointFive => None,
            StopBits::Two => Some(serialport::StopBits::Two),
        }
    }
}

impl FromStr for StopBits {
    type Err = TerminalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(StopBits::One),
            "1.5" => Ok(StopBits::OnePointFive),
            "2" => Ok(StopBits::Two),
            other => Err(TerminalError::Validation(format!(
                "Invalid stop bits: {}. Supported values: 1, 1.5, 2",
                other
            ))),
        }
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopBits::One => f.write_str("1"),
            StopBits::OnePointFive => f.write_str("1.5"),
            StopBits::Two => f.write_str("2"),
        }
    }
}

/// Parity checking mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    /// No parity bit
    #[default]
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

impl FromStr for Parity {
    type Err = TerminalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "n" => Ok(Parity::None),
            "odd" | "o" => Ok(Parity::Odd),
            "even" | "e" => Ok(Parity::Even),
            other => Err(TerminalError::Validation(format!(
                "Invalid parity: {}. Supported values: none, odd, even",
                other
            ))),
        }
    }
}

/// Flow control. Only `None` is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    /// No flow control
    #[default]
    None,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(_: FlowControl) -> Self {
        serialport::FlowControl::None
    }
}

/// Parameters for one open attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialLinkConfig {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub port_identifier: String,
    /// Line speed, one of [`SUPPORTED_BAUD_RATES`]
    pub baud_rate: u32,
    /// Data bits per character
    pub data_bits: DataBits,
    /// Stop bits per character
    pub stop_bits: StopBits,
    /// Parity mode
    pub parity: Parity,
    /// Flow control mode
    pub flow_control: FlowControl,
    /// Size of the read slices used while draining the device
    pub read_chunk_hint: usize,
}

impl Default for SerialLinkConfig {
    fn default() -> Self {
        Self {
            port_identifier: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::default(),
            stop_bits: StopBits::default(),
            parity: Parity::default(),
            flow_control: FlowControl::default(),
            read_chunk_hint: DEFAULT_READ_CHUNK,
        }
    }
}

impl SerialLinkConfig {
    /// 8N1 on `port` at `baud_rate`
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_identifier: port.into(),
            baud_rate,
            ..Default::default()
        }
    }

    /// Set the data bits
    pub fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    /// Set the stop bits
    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Set the parity mode
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Set the read slice size
    pub fn with_read_chunk_hint(mut self, hint: usize) -> Self {
        self.read_chunk_hint = hint;
        self
    }

    /// Check the configuration; the first failing rule is reported
    pub fn validate(&self) -> Result<(), TerminalError> {
        if self.port_identifier.is_empty() {
            return Err(TerminalError::Validation(
                "Port name cannot be empty".to_string(),
            ));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.baud_rate) {
            let supported = SUPPORTED_BAUD_RATES
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(TerminalError::Validation(format!(
                "Invalid baud rate: {}. Supported rates: {}",
                self.baud_rate, supported
            )));
        }

        if self.read_chunk_hint == 0 {
            return Err(TerminalError::Validation(
                "Read buffer size must be a positive number".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether [`validate`](Self::validate) passes
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// How received bytes are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Decode with the configured [`Codec`]
    #[default]
    Text,
    /// Uppercase hex byte pairs
    Hex,
}

impl FromStr for DisplayMode {
    type Err = TerminalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "ascii" => Ok(DisplayMode::Text),
            "hex" => Ok(DisplayMode::Hex),
            other => Err(TerminalError::Validation(format!(
                "Invalid display mode: {}",
                other
            ))),
        }
    }
}

/// Text decoder used in [`DisplayMode::Text`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Byte-for-byte onto U+0000..U+00FF
    #[default]
    Latin1,
    /// UTF-8, invalid sequences replaced
    Utf8,
    /// GBK (simplified Chinese); see [`crate::format::decode_with_fallback`]
    Gbk,
}

impl FromStr for Codec {
    type Err = TerminalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latin1" | "latin-1" | "ansi" | "iso-8859-1" => Ok(Codec::Latin1),
            "utf8" | "utf-8" => Ok(Codec::Utf8),
            "gbk" => Ok(Codec::Gbk),
            other => Err(TerminalError::Validation(format!(
                "Invalid encoding: {}. Supported values: latin1, utf8, gbk",
                other
            ))),
        }
    }
}

/// Display formatting options, pushed before each `process()` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatterConfig {
    /// Text or hex rendering
    pub mode: DisplayMode,
    /// Decoder for text mode
    pub codec: Codec,
    /// Prefix each read with `HH:MM:SS.mmm >> `
    pub timestamp_enabled: bool,
    /// In hex mode, break lines around runs of 0x0D/0x0A
    pub hex_newline_splitting: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Text,
            codec: Codec::Latin1,
            timestamp_enabled: false,
            hex_newline_splitting: true,
        }
    }
}

/// User preferences as persisted by the settings collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TerminalPreferences {
    /// Port used last time
    pub last_port: String,
    /// Line speed
    pub baud_rate: u32,
    /// Data bits per character
    pub data_bits: DataBits,
    /// Stop bits per character
    pub stop_bits: StopBits,
    /// Parity mode
    pub parity: Parity,
    /// Render received bytes as hex
    pub hex_display: bool,
    /// Prefix reads with a timestamp
    pub timestamp: bool,
    /// Text-mode decoder
    pub encoding: Codec,
    /// Break hex lines around CR/LF runs
    pub hex_newline: bool,
    /// Parse typed input as hex
    pub hex_send: bool,
    /// Append CR LF to typed input
    pub append_newline: bool,
    /// Clear the input field after sending (collaborator-side)
    pub clear_after_send: bool,
}

impl Default for TerminalPreferences {
    fn default() -> Self {
        Self {
            last_port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            hex_display: false,
            timestamp: false,
            encoding: Codec::Latin1,
            hex_newline: true,
            hex_send: false,
            append_newline: true,
            clear_after_send: false,
        }
    }
}

impl TerminalPreferences {
    /// Link parameters for an open attempt
    pub fn link_config(&self) -> SerialLinkConfig {
        SerialLinkConfig::new(self.last_port.clone(), self.baud_rate)
            .with_data_bits(self.data_bits)
            .with_stop_bits(self.stop_bits)
            .with_parity(self.parity)
    }

    /// Formatter settings
    pub fn formatter_config(&self) -> FormatterConfig {
        FormatterConfig {
            mode: if self.hex_display {
                DisplayMode::Hex
            } else {
                DisplayMode::Text
            },
            codec: self.encoding,
            timestamp_enabled: self.timestamp,
            hex_newline_splitting: self.hex_newline,
        }
    }

    /// Outbound encoding settings
    pub fn send_options(&self) -> SendOptions {
        SendOptions {
            hex: self.hex_send,
            append_newline: self.append_newline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_8n1() {
        let cfg = SerialLinkConfig::default();
        assert_eq!(cfg.baud_rate, 115200);
        assert_eq!(cfg.data_bits, DataBits::Eight);
        assert_eq!(cfg.stop_bits, StopBits::One);
        assert_eq!(cfg.parity, Parity::None);
        assert_eq!(cfg.read_chunk_hint, 4096);
    }

    #[test]
    fn test_validation_order() {
        // Empty port is reported even when the baud rate is also wrong
        let cfg = SerialLinkConfig::new("", 12345);
        assert_eq!(
            cfg.validate(),
            Err(TerminalError::Validation(
                "Port name cannot be empty".to_string()
            ))
        );
    }

    #[test]
    fn test_zero_chunk_hint_rejected() {
        let cfg = SerialLinkConfig::new("/dev/ttyUSB0", 9600).with_read_chunk_hint(0);
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("Read buffer size"));
    }

    #[test]
    fn test_data_bits_conversion() {
        assert_eq!(DataBits::try_from(7).unwrap(), DataBits::Seven);
        assert!(DataBits::try_from(9).is_err());
        assert_eq!(u8::from(DataBits::Five), 5);
    }

    #[test]
    fn test_stop_bits_parse() {
        assert_eq!("1.5".parse::<StopBits>().unwrap(), StopBits::OnePointFive);
        assert!("3".parse::<StopBits>().is_err());
        assert!(StopBits::OnePointFive.to_serialport().is_none());
    }

    #[test]
    fn test_codec_aliases() {
        assert_eq!("ANSI".parse::<Codec>().unwrap(), Codec::Latin1);
        assert_eq!("utf-8".parse::<Codec>().unwrap(), Codec::Utf8);
        assert!("ebcdic".parse::<Codec>().is_err());
    }
}
