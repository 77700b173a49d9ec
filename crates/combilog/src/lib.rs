//! Host-side driver for COMBILOG environmental data loggers.
//!
//! This crate implements the ASCII telegram protocol spoken by COMBILOG
//! loggers over a serial line. It provides:
//!
//! - **Protocol codec** ([`protocol`]) -- encode `$<addr><cmd>\r`
//!   telegrams, classify Ack/Nak bytes, frame responses, and decode the
//!   hex-encoded IEEE-754 values inside event records.
//! - **Command builders** ([`commands`]) -- construct correctly-formatted
//!   telegrams for every supported operation and parse the simple answers.
//! - **Field decoders** ([`fields`]) -- turn fixed-offset metadata
//!   responses into structured records.
//! - **Driver** ([`logger`]) -- [`CombilogLogger`], the request/response
//!   driver with pointer validation and event emission.
//! - **Event reader** ([`reader`]) -- bounded traversal of stored events
//!   and the shapes of a full download.
//! - **Builder** ([`builder`]) -- fluent builder API for constructing
//!   [`CombilogLogger`] instances with factory defaults.
//!
//! # Read pointers
//!
//! The logger keeps two independent read pointers into its event storage.
//! Pointer 1 is addressed with upper-case command letters (`C`, `E`, `N`),
//! pointer 2 with the lower-case forms (`c`, `e`, `n`). Two clients can
//! therefore download the same log without disturbing each other.
//!
//! # Example
//!
//! ```
//! use combilog::protocol::{encode_telegram, decode_hex_float};
//! use combilog::commands::cmd_read_event;
//! use combilog_core::{Address, Pointer};
//!
//! let addr = Address::default();
//! assert_eq!(cmd_read_event(&addr, Pointer::Two).unwrap(), b"$01e\r");
//! assert_eq!(encode_telegram(&addr, &["V"]).unwrap(), b"$01V\r");
//! assert_eq!(decode_hex_float("42493CD3").unwrap(), 50.31);
//! ```

pub mod builder;
pub mod commands;
pub mod fields;
pub mod logger;
pub mod protocol;
pub mod reader;

// Re-export the primary types for ergonomic `use combilog::*`.
pub use builder::LoggerBuilder;
pub use fields::{
    CalculationType, ChannelInfo, ChannelType, DataFormat, DeviceId, DeviceInfo, DeviceStatus,
    EventRecord, HostInput, RateConfig,
};
pub use logger::CombilogLogger;
pub use reader::{EventReader, LogData, OutputFormat};
