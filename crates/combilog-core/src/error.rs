//! Error types for the COMBILOG driver.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport failures, telegram decode
//! failures, logger-side refusals, and local argument validation are all
//! captured here as distinct variants so callers can match on them.

/// The error type for all COMBILOG operations.
///
/// Validation variants ([`InvalidPointer`](Error::InvalidPointer),
/// [`InvalidDate`](Error::InvalidDate), [`InvalidParameter`](Error::InvalidParameter))
/// are raised before any telegram is sent. None of the variants are retried
/// by the driver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port could not be opened, write failed).
    #[error("transport error: {0}")]
    Transport(String),

    /// A data response did not have the expected shape (wrong length,
    /// non-numeric field, missing terminator).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Timed out waiting for the terminator of a response.
    ///
    /// This typically indicates the logger is unpowered, the baud rate is
    /// wrong, or no logger answers at the configured address.
    #[error("timeout waiting for response")]
    Timeout,

    /// The logger answered a write-style command with something other than
    /// a single Ack (0x06) or Nak (0x15) byte.
    #[error("unknown acknowledgement byte returned: {0:02X?}")]
    UnknownAcknowledgement(Vec<u8>),

    /// The logger refused a write, positioning, or delete command with Nak.
    #[error("NAK - call not successful: {0}")]
    CallNotSuccessful(String),

    /// A channel value could not be read.
    #[error("cannot read channel {channel}: {reason}")]
    Channel {
        /// The channel identifier as sent to the logger.
        channel: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The logger has no channel with the requested identifier.
    #[error("channel {0:?} not found on the logger")]
    ChannelNotFound(String),

    /// A read pointer identifier outside `1` and `2`.
    #[error("invalid pointer {0:?}, must be one of 1, 2")]
    InvalidPointer(String),

    /// A date argument that does not serialize to `YYMMDDHHMMSS`.
    #[error(
        "invalid date {text:?}: expected 12 characters in the pattern YYMMDDHHMMSS (%y%m%d%H%M%S), got {len}"
    )]
    InvalidDate {
        /// Number of characters in the offending text.
        len: usize,
        /// The offending text.
        text: String,
    },

    /// An invalid argument was passed to a driver operation or configuration
    /// constructor.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Hex-encoded float text could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// No connection to the logger has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the logger was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let e = Error::Transport("port busy".into());
        assert_eq!(e.to_string(), "transport error: port busy");
    }

    #[test]
    fn error_display_unknown_ack() {
        let e = Error::UnknownAcknowledgement(vec![0x41]);
        assert_eq!(e.to_string(), "unknown acknowledgement byte returned: [41]");
    }

    #[test]
    fn error_display_call_not_successful() {
        let e = Error::CallNotSuccessful("write channel 20".into());
        let msg = e.to_string();
        assert!(msg.contains("NAK"));
        assert!(msg.contains("channel 20"));
    }

    #[test]
    fn error_display_channel() {
        let e = Error::Channel {
            channel: "01".into(),
            reason: "the channel could not be read".into(),
        };
        assert_eq!(
            e.to_string(),
            "cannot read channel 01: the channel could not be read"
        );
    }

    #[test]
    fn error_display_channel_not_found() {
        let e = Error::ChannelNotFound("not_existing_channel".into());
        assert!(e.to_string().contains("not_existing_channel"));
    }

    #[test]
    fn error_display_invalid_pointer() {
        let e = Error::InvalidPointer("5".into());
        assert!(e.to_string().contains("\"5\""));
    }

    #[test]
    fn error_display_invalid_date() {
        let e = Error::InvalidDate {
            len: 9,
            text: "200904172".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("got 9"));
        assert!(msg.contains("YYMMDDHHMMSS"));
        assert!(msg.contains("%y%m%d%H%M%S"));
    }

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for response");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
