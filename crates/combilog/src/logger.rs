//! CombilogLogger -- the driver for one addressed COMBILOG data logger.
//!
//! This module ties the telegram codec ([`protocol`], [`commands`],
//! [`fields`]) to a [`Transport`] to produce a working driver. It handles
//! the request/response exchange, Ack/Nak classification, pointer
//! validation, and event emission.
//!
//! The link is strictly half-duplex: every operation sends one telegram
//! and waits for one response before returning. The transport sits behind
//! a mutex, so concurrent callers on the same driver are serialized rather
//! than interleaved on the wire. Read pointers live on the logger; the
//! driver never caches their position.

use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use combilog_core::error::{Error, Result};
use combilog_core::events::LoggerEvent;
use combilog_core::transport::{redact_telegram, Transport};
use combilog_core::types::{Address, IntoPointer, LoggerDate, Pointer};

use crate::commands;
use crate::fields::{self, ChannelInfo, DeviceId, DeviceInfo, DeviceStatus, EventRecord, RateConfig};
use crate::protocol::{self, Acknowledgement};
use crate::reader::{EventReader, LogData, OutputFormat};

/// A connected COMBILOG logger.
///
/// Constructed via [`LoggerBuilder`](crate::builder::LoggerBuilder). All
/// communication goes through the [`Transport`] provided at build time.
pub struct CombilogLogger {
    transport: Mutex<Box<dyn Transport>>,
    address: Address,
    command_timeout: Duration,
    event_tx: broadcast::Sender<LoggerEvent>,
}

impl CombilogLogger {
    /// Create a new `CombilogLogger` from its constituent parts.
    ///
    /// This is called by [`LoggerBuilder`](crate::builder::LoggerBuilder);
    /// callers should use the builder API instead.
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        address: Address,
        command_timeout: Duration,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        CombilogLogger {
            transport: Mutex::new(transport),
            address,
            command_timeout,
            event_tx,
        }
    }

    /// The bus address every telegram is sent to.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Subscribe to driver events (download progress, pointer moves).
    pub fn subscribe(&self) -> broadcast::Receiver<LoggerEvent> {
        self.event_tx.subscribe()
    }

    pub(crate) fn emit(&self, event: LoggerEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    /// Close the underlying transport.
    pub async fn close(&self) -> Result<()> {
        self.transport.lock().await.close().await
    }

    // ---------------------------------------------------------------
    // Exchange
    // ---------------------------------------------------------------

    /// Send one telegram and return the complete response.
    ///
    /// Reads until the response is complete: one Ack/Nak byte, or data up
    /// to and including `\r`. Anything left unterminated when the command
    /// timeout expires is [`Error::Timeout`].
    async fn exchange(&self, telegram: &[u8]) -> Result<Vec<u8>> {
        let mut transport = self.transport.lock().await;

        debug!(telegram = ?redact_telegram(telegram), "sending telegram");
        transport.send(telegram).await?;

        let deadline = Instant::now() + self.command_timeout;
        let mut buf = [0u8; 256];
        let mut response = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout);
            }
            let n = transport.receive(&mut buf, remaining).await?;
            response.extend_from_slice(&buf[..n]);

            if let Some(len) = protocol::frame_len(&response) {
                response.truncate(len);
                debug!(response = ?protocol::latin1(&response), "received response");
                return Ok(response);
            }
        }
    }

    /// Send a write-style telegram and require an Ack.
    ///
    /// `context` describes the call for the [`Error::CallNotSuccessful`]
    /// raised on Nak.
    async fn execute_ack(&self, telegram: &[u8], context: impl FnOnce() -> String) -> Result<()> {
        let response = self.exchange(telegram).await?;
        match protocol::classify_ack(&response)? {
            Acknowledgement::Ack => Ok(()),
            Acknowledgement::Nak => {
                let context = context();
                warn!(%context, "logger answered NAK");
                Err(Error::CallNotSuccessful(context))
            }
        }
    }

    // ---------------------------------------------------------------
    // Authentication and pointers
    // ---------------------------------------------------------------

    /// Log in with the logger password.
    ///
    /// Returns `true` on Ack and `false` on Nak (wrong password). Any other
    /// answer is [`Error::UnknownAcknowledgement`].
    pub async fn authenticate(&self, password: &str) -> Result<bool> {
        let cmd = commands::cmd_authenticate(&self.address, password)?;
        let response = self.exchange(&cmd).await?;
        let ok = protocol::classify_ack(&response)? == Acknowledgement::Ack;
        debug!(authenticated = ok, "authentication answered");
        Ok(ok)
    }

    /// Move a read pointer to the oldest stored event.
    pub async fn pointer_to_start(&self, pointer: impl IntoPointer) -> Result<()> {
        let pointer = pointer.into_pointer()?;
        let cmd = commands::cmd_pointer_to_start(&self.address, pointer)?;
        self.execute_ack(&cmd, || format!("set pointer {pointer} to start"))
            .await?;
        self.emit(LoggerEvent::PointerMoved { pointer });
        Ok(())
    }

    /// Move a read pointer to the first event at or after `date`.
    ///
    /// `date` may be a chrono timestamp or `YYMMDDHHMMSS` text.
    pub async fn pointer_to_date(
        &self,
        pointer: impl IntoPointer,
        date: impl LoggerDate,
    ) -> Result<()> {
        let pointer = pointer.into_pointer()?;
        let date = date.to_logger_date()?;
        let cmd = commands::cmd_pointer_to_date(&self.address, pointer, &date)?;
        self.execute_ack(&cmd, || format!("set pointer {pointer} to date {date}"))
            .await?;
        self.emit(LoggerEvent::PointerMoved { pointer });
        Ok(())
    }

    /// Move a read pointer to an absolute log position.
    pub async fn pointer_to_pos(&self, pointer: impl IntoPointer, position: u32) -> Result<()> {
        let pointer = pointer.into_pointer()?;
        let cmd = commands::cmd_pointer_to_position(&self.address, pointer, position)?;
        self.execute_ack(&cmd, || {
            format!("set pointer {pointer} to position {position}")
        })
        .await?;
        self.emit(LoggerEvent::PointerMoved { pointer });
        Ok(())
    }

    // ---------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------

    /// Number of events between the pointer and the end of storage.
    pub async fn get_event_count(&self, pointer: impl IntoPointer) -> Result<u32> {
        let pointer = pointer.into_pointer()?;
        let cmd = commands::cmd_event_count(&self.address, pointer)?;
        let response = self.exchange(&cmd).await?;
        commands::parse_count_response(&response)
    }

    /// Read the event under the pointer and advance it by one.
    pub async fn read_event(&self, pointer: impl IntoPointer) -> Result<EventRecord> {
        let pointer = pointer.into_pointer()?;
        self.read_event_at(pointer).await
    }

    pub(crate) async fn read_event_at(&self, pointer: Pointer) -> Result<EventRecord> {
        let cmd = commands::cmd_read_event(&self.address, pointer)?;
        let response = self.exchange(&cmd).await?;
        fields::parse_event(&response)
    }

    /// Read the most recently read event again without moving the pointer.
    pub async fn repeat_read_event(&self, pointer: impl IntoPointer) -> Result<EventRecord> {
        let pointer = pointer.into_pointer()?;
        let cmd = commands::cmd_repeat_read_event(&self.address, pointer)?;
        let response = self.exchange(&cmd).await?;
        fields::parse_event(&response)
    }

    /// Start a traversal of every event after the pointer's current position.
    ///
    /// Asks the logger for the event count once, then yields that many
    /// records one round trip at a time. The reader borrows the driver
    /// exclusively, so no other call can move the pointer mid-traversal.
    /// Reading again requires repositioning the pointer first.
    pub async fn events(
        &mut self,
        pointer: impl IntoPointer,
        verbose: bool,
    ) -> Result<EventReader<'_>> {
        let pointer = pointer.into_pointer()?;
        let total = self.get_event_count(pointer).await?;
        debug!(%pointer, total, "starting event traversal");
        Ok(EventReader::new(self, pointer, total, verbose))
    }

    /// Download every event after the pointer.
    ///
    /// With `verbose`, one [`LoggerEvent::ReadProgress`] is emitted (and
    /// logged) per event read.
    pub async fn read_logger(
        &mut self,
        pointer: impl IntoPointer,
        verbose: bool,
        format: OutputFormat,
    ) -> Result<LogData> {
        let mut reader = self.events(pointer, verbose).await?;
        // Device-reported count; cap the preallocation.
        let mut records = Vec::with_capacity(reader.total().min(1024) as usize);
        while let Some(record) = reader.next_event().await {
            records.push(record?);
        }
        Ok(LogData::from_records(records, format))
    }

    /// Erase the logger's event storage. This cannot be undone.
    ///
    /// Requires a prior successful [`authenticate`](Self::authenticate).
    pub async fn delete_memory(&self) -> Result<()> {
        let cmd = commands::cmd_delete_memory(&self.address)?;
        self.execute_ack(&cmd, || "delete memory".to_string()).await?;
        info!(address = %self.address, "logger memory deleted");
        self.emit(LoggerEvent::MemoryDeleted);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Channels
    // ---------------------------------------------------------------

    /// Read the current value of a channel.
    pub async fn read_channel(&self, channel: &str) -> Result<f64> {
        let cmd = commands::cmd_read_channel(&self.address, channel)?;
        let response = self.exchange(&cmd).await?;
        commands::parse_channel_value(channel, &response)
    }

    /// Write a value into a channel. Requires prior authentication.
    pub async fn write_channel(&self, channel: &str, value: f64) -> Result<()> {
        let cmd = commands::cmd_write_channel(&self.address, channel, value)?;
        self.execute_ack(&cmd, || format!("write {value} to channel {channel}"))
            .await
    }

    /// Reset a channel (e.g. a continuous sum). Requires prior authentication.
    pub async fn reset_channel(&self, channel: &str) -> Result<()> {
        let cmd = commands::cmd_reset_channel(&self.address, channel)?;
        self.execute_ack(&cmd, || format!("reset channel {channel}"))
            .await
    }

    /// Read the configuration of a channel.
    pub async fn channel_info(&self, channel: &str) -> Result<ChannelInfo> {
        let cmd = commands::cmd_channel_info(&self.address, channel)?;
        let response = self.exchange(&cmd).await?;
        fields::parse_channel_info(channel, &response)
    }

    /// Notations of every internal channel, in channel order.
    pub async fn channel_list(&self) -> Result<Vec<String>> {
        let count = self.device_info().await?.channel_count;
        let mut names = Vec::with_capacity(usize::from(count));
        for nr in 1..=count {
            let info = self.channel_info(&format!("{nr:02}")).await?;
            names.push(info.notation);
        }
        Ok(names)
    }

    // ---------------------------------------------------------------
    // Device metadata
    // ---------------------------------------------------------------

    /// Read vendor, model and firmware revisions.
    pub async fn device_id(&self) -> Result<DeviceId> {
        let cmd = commands::cmd_device_id(&self.address)?;
        fields::parse_device_id(&self.exchange(&cmd).await?)
    }

    /// Read location, serial number and channel count.
    pub async fn device_info(&self) -> Result<DeviceInfo> {
        let cmd = commands::cmd_device_info(&self.address)?;
        fields::parse_device_info(&self.exchange(&cmd).await?)
    }

    /// Read the raw channel and module status flags.
    pub async fn device_status(&self) -> Result<DeviceStatus> {
        let cmd = commands::cmd_device_status(&self.address)?;
        fields::parse_device_status(&self.exchange(&cmd).await?)
    }

    /// Switch transparent (master network) mode on or off.
    pub async fn transparent_mode(&self, on: bool) -> Result<()> {
        let cmd = commands::cmd_transparent_mode(&self.address, on)?;
        self.execute_ack(&cmd, || format!("set transparent mode {on}"))
            .await
    }

    // ---------------------------------------------------------------
    // Clock and rates
    // ---------------------------------------------------------------

    /// Read the logger's clock.
    pub async fn read_datetime(&self) -> Result<NaiveDateTime> {
        let cmd = commands::cmd_read_datetime(&self.address)?;
        commands::parse_datetime_response(&self.exchange(&cmd).await?)
    }

    /// Set the logger's clock.
    ///
    /// `date` may be a chrono timestamp or `YYMMDDHHMMSS` text.
    pub async fn set_datetime(&self, date: impl LoggerDate) -> Result<()> {
        let date = date.to_logger_date()?;
        let cmd = commands::cmd_set_datetime(&self.address, &date)?;
        self.execute_ack(&cmd, || format!("set clock to {date}"))
            .await?;
        info!(address = %self.address, %date, "logger clock set");
        Ok(())
    }

    /// Set the logger's clock to the host's local time.
    pub async fn set_datetime_now(&self) -> Result<()> {
        self.set_datetime(chrono::Local::now()).await
    }

    /// Read the measuring rate and averaging interval.
    pub async fn get_rate(&self) -> Result<RateConfig> {
        let cmd = commands::cmd_get_rate(&self.address)?;
        fields::parse_rate(&self.exchange(&cmd).await?)
    }

    /// Set the measuring rate (at most 99 s) and averaging interval
    /// (at most 43200 s).
    pub async fn set_rate(&self, measuring_rate: u32, averaging_interval: u32) -> Result<()> {
        let cmd = commands::cmd_set_rate(&self.address, measuring_rate, averaging_interval)?;
        self.execute_ack(&cmd, || {
            format!("set rate to {measuring_rate} s / {averaging_interval} s")
        })
        .await?;
        info!(measuring_rate, averaging_interval, "logger rates set");
        Ok(())
    }

    /// Send a telegram the driver does not model and return the raw answer.
    ///
    /// `parts` are concatenated after the address. The answer is returned
    /// as Latin-1 text including any `$` marker, without the terminator.
    pub async fn raw_call(&self, parts: &[&str]) -> Result<String> {
        let cmd = protocol::encode_telegram(&self.address, parts)?;
        let response = self.exchange(&cmd).await?;
        let body = response
            .strip_suffix(&[protocol::TERMINATOR])
            .unwrap_or(&response);
        Ok(protocol::latin1(body))
    }
}
