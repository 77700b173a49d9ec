//! LoggerBuilder -- fluent builder for constructing [`CombilogLogger`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! the bus address, serial line settings, and timeout values before
//! establishing the transport connection.
//!
//! # Example
//!
//! ```no_run
//! use combilog::builder::LoggerBuilder;
//! use combilog_core::Address;
//! use std::time::Duration;
//!
//! # async fn example() -> combilog_core::Result<()> {
//! let logger = LoggerBuilder::new()
//!     .address(Address::new(1)?)
//!     .serial_port("/dev/ttyUSB0")
//!     .baud_rate(9600)
//!     .command_timeout(Duration::from_secs(2))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use combilog_core::error::{Error, Result};
use combilog_core::transport::Transport;
use combilog_core::types::Address;
use combilog_transport::{BaudRate, SerialConfig, SerialTransport};

use crate::logger::CombilogLogger;

/// Fluent builder for [`CombilogLogger`].
///
/// Defaults match a logger fresh from the factory: address `01`, 9600 baud
/// 8N1, and a one second response timeout.
pub struct LoggerBuilder {
    address: Address,
    serial_port: Option<String>,
    serial_config: SerialConfig,
    baud_rate: Option<u32>,
    command_timeout: Option<Duration>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        LoggerBuilder {
            address: Address::default(),
            serial_port: None,
            serial_config: SerialConfig::default(),
            baud_rate: None,
            command_timeout: None,
        }
    }

    /// Set the logger's bus address (default `01`).
    pub fn address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Replace the full serial line configuration.
    pub fn serial_config(mut self, config: SerialConfig) -> Self {
        self.serial_config = config;
        self
    }

    /// Override the baud rate. Checked against the supported rates when
    /// the logger is built.
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = Some(baud);
        self
    }

    /// Set how long to wait for a complete response (default: the serial
    /// config's timeout, one second).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    fn resolved_config(&self) -> Result<SerialConfig> {
        let mut config = self.serial_config.clone();
        if let Some(baud) = self.baud_rate {
            config.baud_rate = BaudRate::try_from(baud)?;
        }
        if let Some(timeout) = self.command_timeout {
            config.timeout = timeout;
        }
        if config.timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "command timeout must be greater than zero".into(),
            ));
        }
        Ok(config)
    }

    /// Build a [`CombilogLogger`] with a caller-provided transport.
    ///
    /// This is the primary entry point for testing (pass a
    /// `MockTransport` from `combilog-test-harness`) and for
    /// advanced use cases where the caller manages the transport
    /// lifecycle directly.
    pub async fn build_with_transport(
        self,
        transport: Box<dyn Transport>,
    ) -> Result<CombilogLogger> {
        let config = self.resolved_config()?;
        Ok(CombilogLogger::new(transport, self.address, config.timeout))
    }

    /// Build a [`CombilogLogger`] using a serial transport.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<CombilogLogger> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;
        let config = self.resolved_config()?;

        let transport = SerialTransport::open_with_config(port, config).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combilog_test_harness::MockTransport;

    #[tokio::test]
    async fn builder_defaults() {
        let logger = LoggerBuilder::new()
            .build_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();
        assert_eq!(logger.address().as_str(), "01");
    }

    #[tokio::test]
    async fn builder_custom_address() {
        let mut mock = MockTransport::new();
        mock.expect_ack(b"$07C\r");
        let logger = LoggerBuilder::new()
            .address("07".parse().unwrap())
            .command_timeout(Duration::from_millis(200))
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();
        logger.pointer_to_start(1).await.unwrap();
    }

    #[tokio::test]
    async fn builder_rejects_unsupported_baud_rate() {
        let result = LoggerBuilder::new()
            .baud_rate(115_200)
            .build_with_transport(Box::new(MockTransport::new()))
            .await;
        let msg = result.err().unwrap().to_string();
        assert!(msg.contains("115200"));
    }

    #[tokio::test]
    async fn builder_rejects_zero_timeout() {
        let result = LoggerBuilder::new()
            .command_timeout(Duration::ZERO)
            .build_with_transport(Box::new(MockTransport::new()))
            .await;
        assert!(matches!(result.err().unwrap(), Error::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn builder_serial_port_required_for_build() {
        let result = LoggerBuilder::new().build().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn builder_fluent_chain() {
        let config = SerialConfig {
            timeout: Duration::from_millis(750),
            ..Default::default()
        };
        let logger = LoggerBuilder::default()
            .serial_port("/dev/ttyUSB0")
            .serial_config(config)
            .baud_rate(38_400)
            .address(Address::new(99).unwrap())
            .build_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();
        assert_eq!(logger.address().to_string(), "99");
    }
}
