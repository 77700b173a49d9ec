//! combilog-test-harness: Test utilities and mock transports for the
//! COMBILOG driver.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the telegram layer without a logger attached.

pub mod mock_serial;

pub use mock_serial::MockTransport;
