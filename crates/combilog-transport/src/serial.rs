//! Serial port transport for logger communication.
//!
//! This module provides [`SerialTransport`], which implements the [`Transport`]
//! trait for RS-232 and RS-485 links (usually through a USB adapter) to a
//! COMBILOG logger.
//!
//! The logger only supports a small set of line settings, so every setting
//! in [`SerialConfig`] is a validated type. Constructing one from a raw
//! number or string fails with [`Error::InvalidParameter`] naming the
//! offending value and the accepted set.
//!
//! # Example
//!
//! ```no_run
//! use combilog_transport::{SerialConfig, SerialTransport};
//! use combilog_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> combilog_core::Result<()> {
//! let mut transport = SerialTransport::open_with_config("/dev/ttyUSB0", SerialConfig::default()).await?;
//!
//! // Ask logger 01 for its clock.
//! transport.send(b"$01H\r").await?;
//!
//! let mut buf = [0u8; 64];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use combilog_core::error::{Error, Result};
use combilog_core::transport::{redact_telegram, Transport};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Baud rates supported by the logger.
pub const SUPPORTED_BAUD_RATES: [u32; 5] = [2400, 4800, 9600, 19200, 38400];

/// Serial port configuration.
///
/// Defaults match the logger's factory settings:
/// - 9600 baud
/// - 8 data bits
/// - No parity
/// - 1 stop bit
/// - 1 second read timeout
#[derive(Debug, Clone, PartialEq)]
pub struct SerialConfig {
    /// Baud rate (2400-38400)
    pub baud_rate: BaudRate,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Number of stop bits (typically 1)
    pub stop_bits: StopBits,
    /// Parity checking (typically None)
    pub parity: Parity,
    /// How long to wait for a response terminator
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: BaudRate::default(),
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            timeout: Duration::from_secs(1),
        }
    }
}

/// A baud rate the logger supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaudRate(u32);

impl BaudRate {
    /// The rate in bits per second.
    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        BaudRate(9600)
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = Error;

    fn try_from(baud: u32) -> Result<Self> {
        if SUPPORTED_BAUD_RATES.contains(&baud) {
            Ok(BaudRate(baud))
        } else {
            Err(Error::InvalidParameter(format!(
                "invalid baud rate {baud}, must be one of 2400, 4800, 9600, 19200, 38400"
            )))
        }
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl TryFrom<u8> for DataBits {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self> {
        match bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            n => Err(Error::InvalidParameter(format!(
                "invalid byte size {n}, must be one of 5, 6, 7, 8"
            ))),
        }
    }
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => tokio_serial::DataBits::Five,
            DataBits::Six => tokio_serial::DataBits::Six,
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self> {
        match bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            n => Err(Error::InvalidParameter(format!(
                "invalid stop bits {n}, must be one of 1, 2"
            ))),
        }
    }
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Parses the single-letter forms `N`, `E` and `O`.
impl FromStr for Parity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "N" => Ok(Parity::None),
            "E" => Ok(Parity::Even),
            "O" => Ok(Parity::Odd),
            other => Err(Error::InvalidParameter(format!(
                "invalid parity {other:?}, must be one of N, E, O"
            ))),
        }
    }
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Parse a timeout given as floating-point seconds (e.g. `"1.5"`).
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if the text is not a finite,
/// non-negative float.
pub fn parse_timeout(text: &str) -> Result<Duration> {
    let secs: f64 = text.trim().parse().map_err(|_| {
        Error::InvalidParameter(format!(
            "timeout must be a float number of seconds, got {text:?}"
        ))
    })?;
    Duration::try_from_secs_f64(secs).map_err(|_| {
        Error::InvalidParameter(format!(
            "timeout must be a non-negative float number of seconds, got {text:?}"
        ))
    })
}

/// Serial port transport for logger communication.
///
/// Implements the [`Transport`] trait for a serial link to one logger.
pub struct SerialTransport {
    /// The underlying serial port stream
    port: Option<SerialStream>,
    /// Port name for logging/debugging
    port_name: String,
}

impl SerialTransport {
    /// Open a serial port with the given baud rate and default settings.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
    /// * `baud_rate` - One of 2400, 4800, 9600, 19200, 38400
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate: BaudRate::try_from(baud_rate)?,
            ..Default::default()
        };
        Self::open_with_config(port, config).await
    }

    /// Open a serial port with full configuration control.
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        tracing::debug!(
            port = %port,
            baud_rate = %config.baud_rate,
            data_bits = ?config.data_bits,
            stop_bits = ?config.stop_bits,
            parity = ?config.parity,
            "Opening serial port"
        );

        let serial_stream = tokio_serial::new(port, config.baud_rate.value())
            .data_bits(config.data_bits.into())
            .stop_bits(config.stop_bits.into())
            .parity(config.parity.into())
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(config.timeout)
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "Failed to open serial port");
                Error::Transport(format!("Failed to open serial port {}: {}", port, e))
            })?;

        tracing::info!(port = %port, baud_rate = %config.baud_rate, "Serial port opened successfully");

        Ok(Self {
            port: Some(serial_stream),
            port_name: port.to_string(),
        })
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

fn is_link_loss(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::BrokenPipe || e.kind() == std::io::ErrorKind::NotConnected
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(
            port = %self.port_name,
            bytes = data.len(),
            data = ?redact_telegram(data),
            "Sending data"
        );

        port.write_all(data).await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to send data");
            if is_link_loss(&e) {
                Error::ConnectionLost
            } else {
                Error::Io(e)
            }
        })?;

        port.flush().await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to flush serial port");
            Error::Io(e)
        })?;

        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(timeout, port.read(buf)).await {
            Ok(Ok(n)) => {
                tracing::trace!(
                    port = %self.port_name,
                    bytes = n,
                    data = ?&buf[..n],
                    "Received data"
                );
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(port = %self.port_name, error = %e, "Failed to receive data");
                if is_link_loss(&e) {
                    Err(Error::ConnectionLost)
                } else {
                    Err(Error::Io(e))
                }
            }
            Err(_) => {
                tracing::trace!(
                    port = %self.port_name,
                    timeout_ms = timeout.as_millis(),
                    "Timeout waiting for data"
                );
                Err(Error::Timeout)
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush().await {
                tracing::warn!(
                    port = %self.port_name,
                    error = %e,
                    "Failed to flush before closing (continuing anyway)"
                );
            }
            tracing::info!(port = %self.port_name, "Serial port closed");
        }

        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}
