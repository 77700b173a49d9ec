//! Transport implementations for the COMBILOG driver.
//!
//! This crate provides the concrete [`Transport`](combilog_core::Transport)
//! used against real hardware:
//!
//! - [`SerialTransport`]: USB-serial adapters and RS-232/RS-485 links
//!
//! Line settings are validated types ([`SerialConfig`]), so a rejected baud
//! rate or parity letter is reported before any port is opened.

pub mod serial;

pub use serial::{
    parse_timeout, BaudRate, DataBits, Parity, SerialConfig, SerialTransport, StopBits,
    SUPPORTED_BAUD_RATES,
};
