//! Decoders for the logger's fixed-field responses.
//!
//! Metadata responses carry no delimiters: each field sits at a fixed
//! character range after the leading `$`. The ranges below are the wire
//! layout; every decoder returns a structured record and maps coded
//! enumerations to descriptive variants with an explicit `Unknown` arm.
//!
//! | Record         | Field              | Range   |
//! |----------------|--------------------|---------|
//! | [`DeviceId`]     | vendor             | 1..11   |
//! |                | model              | 11..20  |
//! |                | hardware revision  | 20..25  |
//! |                | software revision  | 25..    |
//! | [`DeviceInfo`]   | location           | 1..21   |
//! |                | serial number      | 21..28  |
//! |                | channel count      | 28..    |
//! | [`DeviceStatus`] | channel status     | 1..9    |
//! |                | module status      | 9..13   |
//! | [`ChannelInfo`]  | type (hex)         | 1..3    |
//! |                | notation           | 3..23   |
//! |                | data format (hex)  | 23..25  |
//! |                | field length (hex) | 25..27  |
//! |                | decimals (hex)     | 27..29  |
//! |                | unit               | 29..35  |
//! |                | host input (hex)   | 35..37  |
//! |                | calculation (hex)  | 37..39  |
//! | [`RateConfig`]   | measuring rate     | 1..3    |
//! |                | averaging interval | 3..8    |

use std::fmt;
use std::ops::{Range, RangeFrom};

use chrono::NaiveDateTime;

use combilog_core::error::{Error, Result};
use combilog_core::types::{parse_logger_date, DATE_LEN};

use crate::protocol::{self, decode_hex_float, FIELD_SEPARATOR, START, TERMINATOR};

/// Length of a complete channel-info response without its terminator.
const CHANNEL_INFO_LEN: usize = 39;

// ---------------------------------------------------------------
// Slicing helpers
// ---------------------------------------------------------------

/// Response bytes without the trailing terminator. The leading `$` stays so
/// that field ranges match the documented offsets.
fn body(response: &[u8]) -> &[u8] {
    response.strip_suffix(&[TERMINATOR]).unwrap_or(response)
}

fn field(body: &[u8], range: Range<usize>, name: &str) -> Result<String> {
    body.get(range.clone())
        .map(protocol::latin1)
        .ok_or_else(|| {
            Error::Protocol(format!(
                "response too short for {name} at {range:?}: {:?}",
                protocol::latin1(body)
            ))
        })
}

fn field_from(body: &[u8], range: RangeFrom<usize>, name: &str) -> Result<String> {
    body.get(range.clone())
        .map(protocol::latin1)
        .ok_or_else(|| {
            Error::Protocol(format!(
                "response too short for {name} at {range:?}: {:?}",
                protocol::latin1(body)
            ))
        })
}

fn hex_field(body: &[u8], range: Range<usize>, name: &str) -> Result<u8> {
    let text = field(body, range, name)?;
    u8::from_str_radix(&text, 16)
        .map_err(|e| Error::Protocol(format!("invalid hex {name} {text:?} ({e})")))
}

fn numeric<T: std::str::FromStr>(text: &str, name: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    text.trim()
        .parse()
        .map_err(|e| Error::Protocol(format!("invalid {name} {text:?} ({e})")))
}

fn check_start(body: &[u8]) -> Result<()> {
    if body.first() == Some(&START) {
        Ok(())
    } else {
        Err(Error::Protocol(format!(
            "expected data response starting with '$', got {:?}",
            protocol::latin1(body)
        )))
    }
}

// ---------------------------------------------------------------
// Channel enumerations
// ---------------------------------------------------------------

/// What a channel does on the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelType {
    /// Code 0: unused slot.
    Empty,
    /// Code 1: measured sensor input.
    AnalogueInput,
    /// Code 2: computed from other channels.
    Arithmetic,
    /// Code 3: switched output.
    DigitalOutput,
    /// Code 4: switched input.
    DigitalInput,
    /// Code 5: value set by the host.
    Setpoint,
    /// Code 6: limit alarm.
    Alarm,
    /// A code outside 0-6; carries the raw code.
    Unknown(u8),
}

impl ChannelType {
    /// Map the logger's numeric type code.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => ChannelType::Empty,
            1 => ChannelType::AnalogueInput,
            2 => ChannelType::Arithmetic,
            3 => ChannelType::DigitalOutput,
            4 => ChannelType::DigitalInput,
            5 => ChannelType::Setpoint,
            6 => ChannelType::Alarm,
            other => ChannelType::Unknown(other),
        }
    }

    /// Human-readable description, e.g. `analogue input channel (AR)`.
    pub fn label(self) -> &'static str {
        match self {
            ChannelType::Empty => "empty channel (EM)",
            ChannelType::AnalogueInput => "analogue input channel (AR)",
            ChannelType::Arithmetic => "arithmetic channel (AR)",
            ChannelType::DigitalOutput => "digital output channel (DO)",
            ChannelType::DigitalInput => "digital input channel (DI)",
            ChannelType::Setpoint => "setpoint channel (VO)",
            ChannelType::Alarm => "alarm channel (AL)",
            ChannelType::Unknown(_) => "unknown channel type",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a channel aggregates samples over the averaging interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalculationType {
    /// Code 0: arithmetic mean.
    Average,
    /// Code 1: mean with wind-direction handling.
    AverageWithWindDirection,
    /// Code 2: sum over the averaging interval.
    IntervalSum,
    /// Code 3: running sum until reset.
    ContinuousSum,
    /// Code 4: vector mean of wind speed.
    VectorialWindVelocity,
    /// Code 5: vector mean of wind direction.
    VectorialWindDirection,
    /// A code outside 0-5; carries the raw code.
    Unknown(u8),
}

impl CalculationType {
    /// Map the logger's numeric calculation code.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => CalculationType::Average,
            1 => CalculationType::AverageWithWindDirection,
            2 => CalculationType::IntervalSum,
            3 => CalculationType::ContinuousSum,
            4 => CalculationType::VectorialWindVelocity,
            5 => CalculationType::VectorialWindDirection,
            other => CalculationType::Unknown(other),
        }
    }

    /// Human-readable description of the aggregation.
    pub fn label(self) -> &'static str {
        match self {
            CalculationType::Average => "normal calculation of average value",
            CalculationType::AverageWithWindDirection => {
                "calculation of average value with wind direction"
            }
            CalculationType::IntervalSum => "calculation of the sum over the averaging interval",
            CalculationType::ContinuousSum => "continuous sum",
            CalculationType::VectorialWindVelocity => "vectorial average for wind velocity",
            CalculationType::VectorialWindDirection => "vectorial average for wind direction",
            CalculationType::Unknown(_) => "unknown type of calculation",
        }
    }
}

impl fmt::Display for CalculationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Storage format of a channel's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    /// Code 0.
    NoFormat,
    /// Code 1: on/off value.
    Bool,
    /// Code 2: whole number.
    Integer,
    /// Code 3: floating-point value.
    Real,
    /// Code 4: eight-bit set.
    Set8,
    /// A code outside 0-4; carries the raw code.
    Unknown(u8),
}

impl DataFormat {
    /// Map the logger's numeric format code.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => DataFormat::NoFormat,
            1 => DataFormat::Bool,
            2 => DataFormat::Integer,
            3 => DataFormat::Real,
            4 => DataFormat::Set8,
            other => DataFormat::Unknown(other),
        }
    }

    /// Human-readable name, e.g. `real`.
    pub fn label(self) -> &'static str {
        match self {
            DataFormat::NoFormat => "no format",
            DataFormat::Bool => "bool",
            DataFormat::Integer => "integer",
            DataFormat::Real => "real",
            DataFormat::Set8 => "set 8",
            DataFormat::Unknown(_) => "unknown data format",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether the host may write a value into the channel.
///
/// The logger reports `0` when host input is possible and `1` when it
/// is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostInput {
    /// Code 0: the host may write the channel.
    Possible,
    /// Code 1: read-only for the host.
    NotPossible,
    /// Any other code; carries the raw code.
    Unknown(u8),
}

impl HostInput {
    /// Map the logger's numeric host-input code.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => HostInput::Possible,
            1 => HostInput::NotPossible,
            other => HostInput::Unknown(other),
        }
    }

    /// `Some(true)` if writable, `None` for an unmapped code.
    pub fn is_possible(self) -> Option<bool> {
        match self {
            HostInput::Possible => Some(true),
            HostInput::NotPossible => Some(false),
            HostInput::Unknown(_) => None,
        }
    }
}

// ---------------------------------------------------------------
// Records
// ---------------------------------------------------------------

/// Configuration of one logger channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub channel_type: ChannelType,
    /// Free-text channel name, trailing padding removed.
    pub notation: String,
    pub data_format: DataFormat,
    /// Displayed width of the value in characters.
    pub field_length: u8,
    /// Digits after the decimal point.
    pub decimals: u8,
    /// Physical unit (Latin-1, e.g. `°C`), padding removed.
    pub unit: String,
    pub host_input: HostInput,
    pub calculation: CalculationType,
}

/// Parse the response to a channel-info request (`B<ch>`).
///
/// # Errors
///
/// A Nak or a response too short to hold every field means the logger has
/// no such channel: [`Error::ChannelNotFound`] naming `channel`.
pub fn parse_channel_info(channel: &str, response: &[u8]) -> Result<ChannelInfo> {
    let body = body(response);
    if protocol::is_nak(response) || body.len() < CHANNEL_INFO_LEN {
        return Err(Error::ChannelNotFound(channel.to_string()));
    }
    check_start(body)?;

    Ok(ChannelInfo {
        channel_type: ChannelType::from_code(hex_field(body, 1..3, "channel type")?),
        notation: field(body, 3..23, "notation")?.trim_end().to_string(),
        data_format: DataFormat::from_code(hex_field(body, 23..25, "data format")?),
        field_length: hex_field(body, 25..27, "field length")?,
        decimals: hex_field(body, 27..29, "decimals")?,
        unit: field(body, 29..35, "unit")?.trim().to_string(),
        host_input: HostInput::from_code(hex_field(body, 35..37, "host input")?),
        calculation: CalculationType::from_code(hex_field(body, 37..39, "calculation type")?),
    })
}

/// Manufacturer identity of the logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId {
    pub vendor: String,
    pub model: String,
    pub hardware_revision: String,
    pub software_revision: String,
}

/// Parse the response to a device-identity request (`V`).
pub fn parse_device_id(response: &[u8]) -> Result<DeviceId> {
    let body = body(response);
    check_start(body)?;
    Ok(DeviceId {
        vendor: field(body, 1..11, "vendor")?.trim().to_string(),
        model: field(body, 11..20, "model")?.trim().to_string(),
        hardware_revision: field(body, 20..25, "hardware revision")?.trim().to_string(),
        software_revision: field_from(body, 25.., "software revision")?.trim().to_string(),
    })
}

/// Site and capacity information of the logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Configured location name, trailing padding removed.
    pub location: String,
    pub serial_number: u32,
    /// Number of internal channels.
    pub channel_count: u16,
}

/// Parse the response to a device-info request (`S`).
pub fn parse_device_info(response: &[u8]) -> Result<DeviceInfo> {
    let body = body(response);
    check_start(body)?;
    Ok(DeviceInfo {
        location: field(body, 1..21, "location")?.trim_end().to_string(),
        serial_number: numeric(&field(body, 21..28, "serial number")?, "serial number")?,
        channel_count: numeric(&field_from(body, 28.., "channel count")?, "channel count")?,
    })
}

/// Raw status flags of the logger's channels and modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    /// Eight status characters, one per channel group.
    pub channel_status: String,
    /// Four status characters, one per module.
    pub module_status: String,
}

/// Parse the response to a device-status request (`Z`).
pub fn parse_device_status(response: &[u8]) -> Result<DeviceStatus> {
    let body = body(response);
    check_start(body)?;
    Ok(DeviceStatus {
        channel_status: field(body, 1..9, "channel status")?,
        module_status: field(body, 9..13, "module status")?,
    })
}

/// Sampling configuration: how often channels are measured and over how
/// long values are averaged before being logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateConfig {
    /// Seconds between measurements (0-99).
    pub measuring_rate: u32,
    /// Seconds per averaging interval (0-43200).
    pub averaging_interval: u32,
}

/// Parse the response to a rate request (`X`).
pub fn parse_rate(response: &[u8]) -> Result<RateConfig> {
    let body = body(response);
    check_start(body)?;
    Ok(RateConfig {
        measuring_rate: numeric(&field(body, 1..3, "measuring rate")?, "measuring rate")?,
        averaging_interval: numeric(
            &field(body, 3..8, "averaging interval")?,
            "averaging interval",
        )?,
    })
}

/// One logged measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Event name as reported by the logger (a single digit).
    pub name: u8,
    /// Time the event was logged, in logger local time.
    pub timestamp: NaiveDateTime,
    /// Channel values in channel order.
    pub values: Vec<f64>,
}

/// Parse an event response (`E`/`e`/`F`/`f`).
///
/// The payload is `<name><YYMMDDHHMMSS>;<hex>;<hex>;...;`.
pub fn parse_event(response: &[u8]) -> Result<EventRecord> {
    let payload = protocol::latin1(protocol::response_payload(response)?);
    let mut fields = payload.split(FIELD_SEPARATOR);

    let head = fields.next().unwrap_or_default();
    let mut head_chars = head.chars();
    let name = head_chars
        .next()
        .and_then(|c| c.to_digit(10))
        .ok_or_else(|| Error::Protocol(format!("invalid event name in {payload:?}")))?;
    let stamp = head_chars.as_str();
    if stamp.len() != DATE_LEN {
        return Err(Error::Protocol(format!(
            "expected {DATE_LEN}-character event timestamp, got {stamp:?}"
        )));
    }

    let values = fields
        .filter(|f| !f.is_empty())
        .map(decode_hex_float)
        .collect::<Result<Vec<_>>>()?;

    Ok(EventRecord {
        name: name as u8,
        timestamp: parse_logger_date(stamp)?,
        values,
    })
}
