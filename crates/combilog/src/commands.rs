//! COMBILOG telegram builders and simple response parsers.
//!
//! This module provides functions to construct the telegram byte sequence
//! for every operation the driver supports, and to parse the short
//! single-value responses (event count, clock, channel value). Fixed-field
//! metadata responses are decoded in [`fields`](crate::fields).
//!
//! All functions are pure -- they produce or consume byte vectors without
//! performing any I/O. Builders validate their arguments, so a rejected
//! value never reaches the wire.
//!
//! # Command reference
//!
//! Pointer-specific commands use the upper-case letter for pointer 1 and
//! the lower-case letter for pointer 2 (`C`/`c`, `N`/`n`, `E`/`e`, `F`/`f`).

use combilog_core::error::{Error, Result};
use combilog_core::types::{Address, Pointer};

use crate::protocol::{self, encode_telegram};

/// Highest measuring rate the logger accepts, in seconds.
pub const MAX_MEASURING_RATE: u32 = 99;

/// Highest averaging interval the logger accepts, in seconds (12 hours).
pub const MAX_AVERAGING_INTERVAL: u32 = 43_200;

fn pointer_cmd(pointer: Pointer, letter: char) -> String {
    pointer.command(letter).to_string()
}

// ---------------------------------------------------------------
// Authentication and pointers
// ---------------------------------------------------------------

/// Build a "log in" telegram (`P<password>`).
pub fn cmd_authenticate(addr: &Address, password: &str) -> Result<Vec<u8>> {
    encode_telegram(addr, &["P", password])
}

/// Build a "pointer to start of storage" telegram (`C` / `c`).
pub fn cmd_pointer_to_start(addr: &Address, pointer: Pointer) -> Result<Vec<u8>> {
    encode_telegram(addr, &[&pointer_cmd(pointer, 'C')])
}

/// Build a "pointer to date" telegram (`C<YYMMDDHHMMSS>` / `c...`).
///
/// `date` must already be in wire form; see
/// [`LoggerDate`](combilog_core::LoggerDate).
pub fn cmd_pointer_to_date(addr: &Address, pointer: Pointer, date: &str) -> Result<Vec<u8>> {
    encode_telegram(addr, &[&pointer_cmd(pointer, 'C'), date])
}

/// Build a "pointer to log position" telegram (`C.<position>` / `c.<position>`).
pub fn cmd_pointer_to_position(addr: &Address, pointer: Pointer, position: u32) -> Result<Vec<u8>> {
    encode_telegram(addr, &[&pointer_cmd(pointer, 'C'), ".", &position.to_string()])
}

/// Build a "number of events after the pointer" telegram (`N` / `n`).
pub fn cmd_event_count(addr: &Address, pointer: Pointer) -> Result<Vec<u8>> {
    encode_telegram(addr, &[&pointer_cmd(pointer, 'N')])
}

/// Build a "read next event" telegram (`E` / `e`). Advances the pointer.
pub fn cmd_read_event(addr: &Address, pointer: Pointer) -> Result<Vec<u8>> {
    encode_telegram(addr, &[&pointer_cmd(pointer, 'E')])
}

/// Build a "repeat last event" telegram (`F` / `f`). Does not advance.
pub fn cmd_repeat_read_event(addr: &Address, pointer: Pointer) -> Result<Vec<u8>> {
    encode_telegram(addr, &[&pointer_cmd(pointer, 'F')])
}

/// Build a "delete event storage" telegram (`C.ALL`).
pub fn cmd_delete_memory(addr: &Address) -> Result<Vec<u8>> {
    encode_telegram(addr, &["C.ALL"])
}

// ---------------------------------------------------------------
// Device metadata
// ---------------------------------------------------------------

/// Build a "device identity" telegram (`V`).
pub fn cmd_device_id(addr: &Address) -> Result<Vec<u8>> {
    encode_telegram(addr, &["V"])
}

/// Build a "device info" telegram (`S`).
pub fn cmd_device_info(addr: &Address) -> Result<Vec<u8>> {
    encode_telegram(addr, &["S"])
}

/// Build a "device status" telegram (`Z`).
pub fn cmd_device_status(addr: &Address) -> Result<Vec<u8>> {
    encode_telegram(addr, &["Z"])
}

/// Build a "transparent mode" telegram (`T1` / `T0`).
///
/// In transparent mode the logger forwards telegrams to a master network.
pub fn cmd_transparent_mode(addr: &Address, on: bool) -> Result<Vec<u8>> {
    encode_telegram(addr, &["T", if on { "1" } else { "0" }])
}

// ---------------------------------------------------------------
// Channels
// ---------------------------------------------------------------

/// Build a "channel info" telegram (`B<channel>`).
///
/// Internal channels are `01`-`20`, external channels `80`-`BB`.
pub fn cmd_channel_info(addr: &Address, channel: &str) -> Result<Vec<u8>> {
    encode_telegram(addr, &["B", channel])
}

/// Build a "read channel value" telegram (`R<channel>`).
pub fn cmd_read_channel(addr: &Address, channel: &str) -> Result<Vec<u8>> {
    encode_telegram(addr, &["R", channel])
}

/// Build a "write channel value" telegram (`W<channel><value>`).
///
/// The value is sent as decimal text with at least one fractional digit
/// (`10.0`, `-3.25`).
pub fn cmd_write_channel(addr: &Address, channel: &str, value: f64) -> Result<Vec<u8>> {
    if !value.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "channel value must be finite, got {value}"
        )));
    }
    let mut text = value.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    encode_telegram(addr, &["W", channel, &text])
}

/// Build a "reset channel" telegram (`L<channel>`).
pub fn cmd_reset_channel(addr: &Address, channel: &str) -> Result<Vec<u8>> {
    encode_telegram(addr, &["L", channel])
}

// ---------------------------------------------------------------
// Clock and rates
// ---------------------------------------------------------------

/// Build a "read clock" telegram (`H`).
pub fn cmd_read_datetime(addr: &Address) -> Result<Vec<u8>> {
    encode_telegram(addr, &["H"])
}

/// Build a "set clock" telegram (`G<YYMMDDHHMMSS>`).
pub fn cmd_set_datetime(addr: &Address, date: &str) -> Result<Vec<u8>> {
    encode_telegram(addr, &["G", date])
}

/// Build a "read rates" telegram (`X`).
pub fn cmd_get_rate(addr: &Address) -> Result<Vec<u8>> {
    encode_telegram(addr, &["X"])
}

/// Build a "set rates" telegram (`Y<mm><aaaaa>`).
///
/// Both values are zero-padded into a fixed 7-character argument: two
/// digits of measuring rate, five digits of averaging interval.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if `measuring_rate` exceeds 99 or
/// `averaging_interval` exceeds 43200.
pub fn cmd_set_rate(addr: &Address, measuring_rate: u32, averaging_interval: u32) -> Result<Vec<u8>> {
    if measuring_rate > MAX_MEASURING_RATE {
        return Err(Error::InvalidParameter(format!(
            "the measuring rate must not be higher than {MAX_MEASURING_RATE}, got {measuring_rate}"
        )));
    }
    if averaging_interval > MAX_AVERAGING_INTERVAL {
        return Err(Error::InvalidParameter(format!(
            "the maximum averaging rate is {MAX_AVERAGING_INTERVAL}, got {averaging_interval}"
        )));
    }
    encode_telegram(
        addr,
        &["Y", &format!("{measuring_rate:02}{averaging_interval:05}")],
    )
}

// ---------------------------------------------------------------
// Response parsers
// ---------------------------------------------------------------

/// Parse the answer to an event-count request: `$<digits>\r`.
pub fn parse_count_response(response: &[u8]) -> Result<u32> {
    let text = protocol::latin1(protocol::response_payload(response)?);
    text.trim()
        .parse()
        .map_err(|e| Error::Protocol(format!("invalid event count {text:?} ({e})")))
}

/// Parse the answer to a clock request: `$<YYMMDDHHMMSS>\r`.
pub fn parse_datetime_response(response: &[u8]) -> Result<chrono::NaiveDateTime> {
    let text = protocol::latin1(protocol::response_payload(response)?);
    combilog_core::types::parse_logger_date(text.trim())
}

/// Parse the answer to a channel read: `$<decimal value>\r`.
///
/// # Errors
///
/// A Nak, a non-data response, or text that is not a number is
/// [`Error::Channel`] naming `channel`.
pub fn parse_channel_value(channel: &str, response: &[u8]) -> Result<f64> {
    let unreadable = |reason: String| Error::Channel {
        channel: channel.to_string(),
        reason,
    };
    if protocol::is_nak(response) {
        return Err(unreadable("the channel could not be read".into()));
    }
    let payload = protocol::response_payload(response)
        .map_err(|_| unreadable("the channel could not be read".into()))?;
    let text = protocol::latin1(payload);
    text.trim()
        .parse()
        .map_err(|_| unreadable(format!("the channel could not be read, got {text:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Address {
        Address::default()
    }

    #[test]
    fn authenticate_bytes() {
        assert_eq!(cmd_authenticate(&addr(), "12345678").unwrap(), b"$01P12345678\r");
    }

    #[test]
    fn pointer_commands_switch_case() {
        assert_eq!(cmd_pointer_to_start(&addr(), Pointer::One).unwrap(), b"$01C\r");
        assert_eq!(cmd_pointer_to_start(&addr(), Pointer::Two).unwrap(), b"$01c\r");
        assert_eq!(cmd_event_count(&addr(), Pointer::Two).unwrap(), b"$01n\r");
        assert_eq!(cmd_read_event(&addr(), Pointer::One).unwrap(), b"$01E\r");
        assert_eq!(cmd_read_event(&addr(), Pointer::Two).unwrap(), b"$01e\r");
        assert_eq!(cmd_repeat_read_event(&addr(), Pointer::One).unwrap(), b"$01F\r");
        assert_eq!(cmd_repeat_read_event(&addr(), Pointer::Two).unwrap(), b"$01f\r");
    }

    #[test]
    fn pointer_to_date_bytes() {
        let cmd = cmd_pointer_to_date(&addr(), Pointer::Two, "200904172000").unwrap();
        assert_eq!(cmd, b"$01c200904172000\r");
    }

    #[test]
    fn pointer_to_position_bytes() {
        let cmd = cmd_pointer_to_position(&addr(), Pointer::One, 123).unwrap();
        assert_eq!(cmd, b"$01C.123\r");
    }

    #[test]
    fn delete_memory_bytes() {
        assert_eq!(cmd_delete_memory(&addr()).unwrap(), b"$01C.ALL\r");
    }

    #[test]
    fn metadata_bytes() {
        assert_eq!(cmd_device_id(&addr()).unwrap(), b"$01V\r");
        assert_eq!(cmd_device_info(&addr()).unwrap(), b"$01S\r");
        assert_eq!(cmd_device_status(&addr()).unwrap(), b"$01Z\r");
        assert_eq!(cmd_channel_info(&addr(), "01").unwrap(), b"$01B01\r");
        assert_eq!(cmd_transparent_mode(&addr(), true).unwrap(), b"$01T1\r");
    }

    #[test]
    fn write_channel_formats_value() {
        assert_eq!(cmd_write_channel(&addr(), "08", 10.0).unwrap(), b"$01W0810.0\r");
        assert_eq!(cmd_write_channel(&addr(), "08", -3.25).unwrap(), b"$01W08-3.25\r");
        assert!(cmd_write_channel(&addr(), "08", f64::NAN).is_err());
    }

    #[test]
    fn set_rate_pads_fields() {
        assert_eq!(cmd_set_rate(&addr(), 5, 10).unwrap(), b"$01Y0500010\r");
        assert_eq!(cmd_set_rate(&addr(), 10, 10000).unwrap(), b"$01Y1010000\r");
        assert_eq!(cmd_set_rate(&addr(), 99, 43200).unwrap(), b"$01Y9943200\r");
    }

    #[test]
    fn set_rate_rejects_measuring_rate() {
        let msg = cmd_set_rate(&addr(), 123_456_789, 1).unwrap_err().to_string();
        assert!(msg.contains("higher than 99"));
    }

    #[test]
    fn set_rate_rejects_averaging_interval() {
        let msg = cmd_set_rate(&addr(), 1, 123_456_789).unwrap_err().to_string();
        assert!(msg.contains("rate is 43200"));
    }

    #[test]
    fn parse_count() {
        assert_eq!(parse_count_response(b"$0042\r").unwrap(), 42);
        assert_eq!(parse_count_response(b"$0\r").unwrap(), 0);
        assert!(parse_count_response(b"$abc\r").is_err());
    }

    #[test]
    fn parse_datetime() {
        let dt = parse_datetime_response(b"$200904172000\r").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M:%S").to_string(), "2020-09-04 17:20:00");
    }

    #[test]
    fn parse_channel_value_ok() {
        assert_eq!(parse_channel_value("05", b"$2.6\r").unwrap(), 2.6);
    }

    #[test]
    fn parse_channel_value_nak() {
        let err = parse_channel_value("01", &[0x15]).unwrap_err();
        assert!(matches!(err, Error::Channel { ref channel, .. } if channel == "01"));
        assert!(err.to_string().contains("could not be read"));
    }

    #[test]
    fn parse_channel_value_garbage() {
        let err = parse_channel_value("01", b"$----\r").unwrap_err();
        assert!(err.to_string().contains("01"));
    }
}
