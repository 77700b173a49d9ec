//! combilog-core: Core traits, types, and error definitions for the
//! COMBILOG data-logger driver.
//!
//! Front ends and transports depend on these types without pulling in
//! the telegram codec or a concrete serial port.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`Address`] / [`Pointer`] -- validated telegram parameters
//! - [`LoggerEvent`] -- progress notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use events::LoggerEvent;
pub use transport::{redact_telegram, Transport};
pub use types::*;
