//! COMBILOG ASCII telegram encoder/decoder.
//!
//! Every request is a single telegram: a `$` start marker, the logger's
//! two-digit bus address, a command of one or more letters, optional
//! arguments, and a carriage-return terminator.
//!
//! # Telegram format
//!
//! ```text
//! $<address><command><args>\r
//! ```
//!
//! - `address`: Two ASCII digits (`01`-`99`).
//! - `command`: One or more letters (`C`, `E`, `C.ALL`, ...).
//! - Terminator: `\r` (0x0D).
//!
//! # Response format
//!
//! Write-style commands answer with exactly one byte: Ack (0x06) on
//! success or Nak (0x15) on failure, with no terminator. Read-style
//! commands answer with `$`, the payload, and `\r`. Event payloads are
//! `;`-separated, and channel values inside them are 8 hex characters
//! encoding a big-endian IEEE-754 single-precision float.

use bytes::{BufMut, BytesMut};

use combilog_core::error::{Error, Result};
use combilog_core::types::Address;

/// Start-of-telegram marker.
pub const START: u8 = b'$';

/// Telegram and response terminator.
pub const TERMINATOR: u8 = b'\r';

/// Positive acknowledgement byte.
pub const ACK: u8 = 0x06;

/// Negative acknowledgement byte.
pub const NAK: u8 = 0x15;

/// Separator between fields of an event response.
pub const FIELD_SEPARATOR: char = ';';

/// Outcome of a write-style command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// The logger accepted the command (0x06).
    Ack,
    /// The logger refused the command (0x15).
    Nak,
}

/// Encode a telegram into raw bytes ready for transmission.
///
/// Concatenates `$`, the address, each fragment in order, and `\r`.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if a fragment contains a carriage
/// return, which would split the telegram on the wire.
///
/// # Example
///
/// ```
/// use combilog::protocol::encode_telegram;
/// use combilog_core::Address;
///
/// let addr = Address::default();
/// assert_eq!(encode_telegram(&addr, &["C"]).unwrap(), b"$01C\r");
/// assert_eq!(encode_telegram(&addr, &["R", "05"]).unwrap(), b"$01R05\r");
/// ```
pub fn encode_telegram(address: &Address, parts: &[&str]) -> Result<Vec<u8>> {
    if let Some(bad) = parts.iter().find(|p| p.as_bytes().contains(&TERMINATOR)) {
        return Err(Error::InvalidParameter(format!(
            "telegram fragment {bad:?} must not contain a carriage return"
        )));
    }
    let capacity = 2 + address.as_str().len() + parts.iter().map(|p| p.len()).sum::<usize>();
    let mut buf = BytesMut::with_capacity(capacity);
    buf.put_u8(START);
    buf.put_slice(address.as_str().as_bytes());
    for part in parts {
        buf.put_slice(part.as_bytes());
    }
    buf.put_u8(TERMINATOR);
    Ok(buf.to_vec())
}

/// Classify the answer to a write-style command.
///
/// # Errors
///
/// Anything other than exactly one Ack or Nak byte is
/// [`Error::UnknownAcknowledgement`].
pub fn classify_ack(response: &[u8]) -> Result<Acknowledgement> {
    match response {
        [ACK] => Ok(Acknowledgement::Ack),
        [NAK] => Ok(Acknowledgement::Nak),
        other => Err(Error::UnknownAcknowledgement(other.to_vec())),
    }
}

/// Decode 8 hex characters as a big-endian IEEE-754 `f32`, rounded to two
/// decimal places.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the text is not exactly 8 hex digits.
///
/// # Example
///
/// ```
/// use combilog::protocol::decode_hex_float;
///
/// assert_eq!(decode_hex_float("42493CD3").unwrap(), 50.31);
/// assert_eq!(decode_hex_float("00000000").unwrap(), 0.0);
/// ```
pub fn decode_hex_float(hex: &str) -> Result<f64> {
    if hex.len() != 8 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::Decode(format!(
            "expected 8 hex digits for a float value, got {hex:?}"
        )));
    }
    let bits = u32::from_str_radix(hex, 16)
        .map_err(|e| Error::Decode(format!("invalid hex float {hex:?} ({e})")))?;
    let value = f64::from(f32::from_bits(bits));
    Ok((value * 100.0).round() / 100.0)
}

/// Length of the first complete response in `buf`, if there is one.
///
/// A buffer starting with Ack or Nak is complete after that byte; any other
/// response runs up to and including the first `\r`.
pub fn frame_len(buf: &[u8]) -> Option<usize> {
    match buf.first()? {
        &ACK | &NAK => Some(1),
        _ => buf.iter().position(|&b| b == TERMINATOR).map(|pos| pos + 1),
    }
}

/// Whether a response is the single Nak byte.
pub fn is_nak(response: &[u8]) -> bool {
    response == [NAK]
}

/// Strip the `$` marker and `\r` terminator from a data response.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the response does not start with `$`.
pub fn response_payload(response: &[u8]) -> Result<&[u8]> {
    let body = response.strip_suffix(&[TERMINATOR]).unwrap_or(response);
    body.strip_prefix(&[START]).ok_or_else(|| {
        Error::Protocol(format!(
            "expected data response starting with '$', got {:?}",
            latin1(response)
        ))
    })
}

/// Decode bytes as ISO-8859-1.
///
/// The logger stores channel notations and units in Latin-1 (`°`, `²`, `³`),
/// so every byte maps to exactly one character.
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Address {
        Address::default()
    }

    // ---------------------------------------------------------------
    // Telegram encoding
    // ---------------------------------------------------------------

    #[test]
    fn encode_single_letter_command() {
        assert_eq!(encode_telegram(&addr(), &["C"]).unwrap(), b"$01C\r");
    }

    #[test]
    fn encode_command_with_arguments() {
        let tg = encode_telegram(&addr(), &["C", "200904172000"]).unwrap();
        assert_eq!(tg, b"$01C200904172000\r");
    }

    #[test]
    fn encode_multi_letter_command() {
        assert_eq!(encode_telegram(&addr(), &["C.ALL"]).unwrap(), b"$01C.ALL\r");
    }

    #[test]
    fn encode_echoes_address() {
        let addr = Address::new(23).unwrap();
        assert_eq!(encode_telegram(&addr, &["V"]).unwrap(), b"$23V\r");
    }

    #[test]
    fn encode_rejects_carriage_return_in_fragment() {
        let err = encode_telegram(&addr(), &["P", "pass\rword"]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    // ---------------------------------------------------------------
    // Acknowledgements
    // ---------------------------------------------------------------

    #[test]
    fn classify_ack_byte() {
        assert_eq!(classify_ack(&[0x06]).unwrap(), Acknowledgement::Ack);
    }

    #[test]
    fn classify_nak_byte() {
        assert_eq!(classify_ack(&[0x15]).unwrap(), Acknowledgement::Nak);
    }

    #[test]
    fn classify_other_byte_is_fatal() {
        let err = classify_ack(b"A").unwrap_err();
        assert!(matches!(err, Error::UnknownAcknowledgement(ref b) if b == b"A"));
    }

    #[test]
    fn classify_ack_with_trailing_data_is_fatal() {
        assert!(classify_ack(&[0x06, 0x0D]).is_err());
        assert!(classify_ack(&[]).is_err());
    }

    // ---------------------------------------------------------------
    // Hex floats
    // ---------------------------------------------------------------

    #[test]
    fn decode_zero() {
        assert_eq!(decode_hex_float("00000000").unwrap(), 0.0);
    }

    #[test]
    fn decode_rounds_to_two_decimals() {
        assert_eq!(decode_hex_float("42493CD3").unwrap(), 50.31);
    }

    #[test]
    fn decode_negative_value() {
        // -12.5
        assert_eq!(decode_hex_float("C1480000").unwrap(), -12.5);
    }

    #[test]
    fn decode_lowercase_hex() {
        assert_eq!(decode_hex_float("42493cd3").unwrap(), 50.31);
    }

    #[test]
    fn decode_wrong_length() {
        assert!(matches!(
            decode_hex_float("42493C").unwrap_err(),
            Error::Decode(_)
        ));
    }

    #[test]
    fn decode_non_hex() {
        assert!(matches!(
            decode_hex_float("4249XCD3").unwrap_err(),
            Error::Decode(_)
        ));
        assert!(decode_hex_float("+4249CD3").is_err());
    }

    // ---------------------------------------------------------------
    // Framing
    // ---------------------------------------------------------------

    #[test]
    fn frame_len_single_byte_acks() {
        assert_eq!(frame_len(&[ACK]), Some(1));
        assert_eq!(frame_len(&[NAK, b'x']), Some(1));
    }

    #[test]
    fn frame_len_data_response() {
        assert_eq!(frame_len(b"$0042\r"), Some(6));
        assert_eq!(frame_len(b"$0042"), None);
        assert_eq!(frame_len(b""), None);
    }

    #[test]
    fn payload_strips_marker_and_terminator() {
        assert_eq!(response_payload(b"$200904172000\r").unwrap(), b"200904172000");
        assert!(response_payload(b"200904172000\r").is_err());
    }

    #[test]
    fn latin1_decodes_high_bytes() {
        assert_eq!(latin1(b"\xB0C"), "°C");
    }
}
