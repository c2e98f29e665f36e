//! Outbound payload preparation

use serde::{Deserialize, Serialize};

use crate::error::TerminalError;

/// How typed input becomes bytes on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOptions {
    /// Interpret input as hex digit pairs
    pub hex: bool,
    /// Append CR LF after the payload
    pub append_newline: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            hex: false,
            append_newline: true,
        }
    }
}

/// Encode `input` for sending. Empty input yields an empty payload.
pub fn compose(input: &str, options: SendOptions) -> Result<Vec<u8>, TerminalError> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    let mut payload = if options.hex {
        parse_hex(input)?
    } else {
        input.as_bytes().to_vec()
    };

    if options.append_newline {
        payload.extend_from_slice(b"\r\n");
    }
    Ok(payload)
}

/// Parse hex digit pairs, skipping separators
///
/// A trailing single digit becomes the low nibble of a final byte.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, TerminalError> {
    let digits: String = input.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    if digits.len() < 2 {
        return Err(TerminalError::Validation(
            "Input is not valid hexadecimal".to_string(),
        ));
    }

    let even = digits.len() - digits.len() % 2;
    let mut bytes = hex::decode(&digits[..even])
        .map_err(|e| TerminalError::Validation(format!("Input is not valid hexadecimal: {e}")))?;

    if even < digits.len() {
        let last = u8::from_str_radix(&digits[even..], 16).map_err(|e| {
            TerminalError::Validation(format!("Input is not valid hexadecimal: {e}"))
        })?;
        bytes.push(last);
    }
    Ok(bytes)
}
