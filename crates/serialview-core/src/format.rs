//! Byte to display-text formatting
//!
//! Two modes:
//! - text: decode with the configured codec
//! - hex: uppercase two-digit tokens, optionally breaking lines around runs of
//!   CR/LF which are shown as a bracketed token such as `[0D 0A]`
//!
//! Control-byte runs are detected within a single call only. A CR at the end of
//! one read and an LF at the start of the next render as two separate tokens.

use chrono::{Local, NaiveTime};
use encoding_rs::Encoding;
use std::borrow::Cow;

use crate::config::{Codec, DisplayMode, FormatterConfig};

/// Marker written after the timestamp
pub const TIMESTAMP_MARKER: &str = ">>";

/// Timestamp layout, `HH:MM:SS.mmm`
const TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

/// Turns raw reads into display text
#[derive(Debug, Clone, Default)]
pub struct FrameFormatter {
    config: FormatterConfig,
}

impl FrameFormatter {
    /// Formatter with the given settings
    pub fn new(config: FormatterConfig) -> Self {
        Self { config }
    }

    /// Current settings
    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Replace the configuration used by the next `process()` call
    pub fn set_config(&mut self, config: FormatterConfig) {
        self.config = config;
    }

    /// Switch between text and hex
    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.config.mode = mode;
    }

    /// Toggle the timestamp prefix
    pub fn set_timestamp_enabled(&mut self, enabled: bool) {
        self.config.timestamp_enabled = enabled;
    }

    /// Select the text-mode decoder
    pub fn set_codec(&mut self, codec: Codec) {
        self.config.codec = codec;
    }

    /// Toggle CR/LF line breaking in hex mode
    pub fn set_hex_newline_splitting(&mut self, enabled: bool) {
        self.config.hex_newline_splitting = enabled;
    }

    /// Format `raw` using the local wall clock for the timestamp
    pub fn process(&self, raw: &[u8]) -> String {
        format_bytes(raw, &self.config, Local::now().time())
    }
}

/// Pure formatting with an explicit clock reading
pub fn format_bytes(raw: &[u8], config: &FormatterConfig, now: NaiveTime) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let body = match config.mode {
        DisplayMode::Text => decode(raw, config.codec).into_owned(),
        DisplayMode::Hex => to_hex(raw, config.hex_newline_splitting),
    };

    if config.timestamp_enabled {
        format!("{} {} {}", format_timestamp(now), TIMESTAMP_MARKER, body)
    } else {
        body
    }
}

/// `HH:MM:SS.mmm`
pub fn format_timestamp(time: NaiveTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Decode bytes for text mode
pub fn decode(raw: &[u8], codec: Codec) -> Cow<'_, str> {
    match codec {
        Codec::Latin1 => Cow::Owned(decode_latin1(raw)),
        Codec::Utf8 => String::from_utf8_lossy(raw),
        Codec::Gbk => decode_gbk(raw),
    }
}

/// Byte-for-byte mapping onto U+0000..U+00FF
pub fn decode_latin1(raw: &[u8]) -> String {
    raw.iter().map(|&b| char::from(b)).collect()
}

fn decode_gbk(raw: &[u8]) -> Cow<'_, str> {
    decode_with_fallback(raw, Some(encoding_rs::GBK))
}

/// Decode with `encoding`, or without one: strict UTF-8, then latin1
pub fn decode_with_fallback<'a>(raw: &'a [u8], encoding: Option<&'static Encoding>) -> Cow<'a, str> {
    if let Some(encoding) = encoding {
        let (text, _had_errors) = encoding.decode_without_bom_handling(raw);
        return text;
    }

    tracing::debug!("no decoder for codec, falling back");
    match std::str::from_utf8(raw) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(decode_latin1(raw)),
    }
}

fn is_line_control(b: u8) -> bool {
    b == b'\r' || b == b'\n'
}

enum HexToken {
    Byte(u8),
    /// Run of CR/LF bytes
    Control(Vec<u8>),
}

fn tokenize(raw: &[u8], split_lines: bool) -> Vec<HexToken> {
    if !split_lines {
        return raw.iter().map(|&b| HexToken::Byte(b)).collect();
    }

    let mut tokens = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if is_line_control(raw[i]) {
            let start = i;
            while i < raw.len() && is_line_control(raw[i]) {
                i += 1;
            }
            tokens.push(HexToken::Control(raw[start..i].to_vec()));
        } else {
            tokens.push(HexToken::Byte(raw[i]));
            i += 1;
        }
    }
    tokens
}

/// Render bytes as uppercase hex
///
/// Exactly one separator between adjacent tokens: a newline when either side is a
/// control token, a space otherwise. Nothing at the start or end.
pub fn to_hex(raw: &[u8], split_lines: bool) -> String {
    let tokens = tokenize(raw, split_lines);
    let mut out = String::with_capacity(raw.len() * 3 + 2);
    let mut prev_control: Option<bool> = None;

    for token in &tokens {
        let is_control = matches!(token, HexToken::Control(_));
        if let Some(prev) = prev_control {
            out.push(if prev || is_control { '\n' } else { ' ' });
        }
        match token {
            HexToken::Byte(b) => push_hex(&mut out, *b),
            HexToken::Control(run) => {
                out.push('[');
                for (idx, b) in run.iter().enumerate() {
                    if idx > 0 {
                        out.push(' ');
                    }
                    push_hex(&mut out, *b);
                }
                out.push(']');
            }
        }
        prev_control = Some(is_control);
    }

    out
}

fn push_hex(out: &mut String, b: u8) {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    out.push(char::from(DIGITS[(b >> 4) as usize]));
    out.push(char::from(DIGITS[(b & 0x0F) as usize]));
}
