//! Transport trait for logger communication.
//!
//! The [`Transport`] trait abstracts over the physical link to a logger.
//! `SerialTransport` in `combilog-transport` drives a real RS-232/RS-485
//! port; `MockTransport` in `combilog-test-harness` replays scripted
//! exchanges for deterministic tests.
//!
//! The telegram layer in the `combilog` crate only ever talks to a
//! `Transport`, never to a serial port directly.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a logger.
///
/// Implementations handle buffering and error recovery at the physical
/// layer. Telegram framing (`$`, address, terminator) is the caller's job.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the logger.
    ///
    /// Implementations should block until all bytes have been written to
    /// the underlying port.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the logger into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if nothing arrives within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}

/// Printable form of outgoing telegram bytes for log output.
///
/// The argument of a login telegram (`$<addr>P<password>\r`) is masked so
/// the password never reaches a log subscriber. Other bytes are shown
/// lossily as UTF-8.
pub fn redact_telegram(data: &[u8]) -> String {
    match data {
        [b'$', a, b, b'P', rest @ ..] if a.is_ascii_digit() && b.is_ascii_digit() => {
            let terminator = if rest.last() == Some(&b'\r') { "\r" } else { "" };
            format!("${}{}P***{terminator}", char::from(*a), char::from(*b))
        }
        _ => String::from_utf8_lossy(data).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_masks_login_password() {
        let shown = redact_telegram(b"$01P12345678\r");
        assert!(!shown.contains("12345678"));
        assert_eq!(shown, "$01P***\r");
    }

    #[test]
    fn redact_leaves_other_telegrams() {
        assert_eq!(redact_telegram(b"$01C200904172000\r"), "$01C200904172000\r");
        assert_eq!(redact_telegram(b"$01V\r"), "$01V\r");
    }
}
