//! Core types used throughout the COMBILOG driver.
//!
//! These are the small value types every telegram carries: the logger's
//! bus address, the identity of one of the two read pointers, and the
//! 12-character `YYMMDDHHMMSS` timestamp format used for both the clock and
//! pointer positioning.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone};

use crate::error::{Error, Result};

/// `strftime` pattern of every timestamp on the wire.
pub const DATE_FORMAT: &str = "%y%m%d%H%M%S";

/// Length of a serialized logger timestamp.
pub const DATE_LEN: usize = 12;

/// Bus address of a logger: always two ASCII digits (`"01"`-`"99"`).
///
/// The address is echoed unchanged in every telegram sent to the logger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Create an address from its numeric value (0-99).
    pub fn new(n: u8) -> Result<Self> {
        if n > 99 {
            return Err(Error::InvalidParameter(format!(
                "logger address must be between 0 and 99, got {n}"
            )));
        }
        Ok(Address(format!("{n:02}")))
    }

    /// The two-digit wire form, e.g. `"01"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Address {
    fn default() -> Self {
        Address("01".to_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Address(s.to_string()))
        } else {
            Err(Error::InvalidParameter(format!(
                "logger address must be two ASCII digits, got {s:?}"
            )))
        }
    }
}

/// One of the logger's two independent read cursors into event storage.
///
/// Pointer position lives on the logger; the driver never caches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pointer {
    /// Pointer 1, addressed by upper-case command letters.
    One,
    /// Pointer 2, addressed by lower-case command letters.
    Two,
}

impl Pointer {
    /// The pointer number as shown to users.
    pub fn number(self) -> u8 {
        match self {
            Pointer::One => 1,
            Pointer::Two => 2,
        }
    }

    /// Select the command letter for this pointer.
    ///
    /// Pointer-2 commands are the lower-case variant of the pointer-1
    /// letter (`C`/`c`, `E`/`e`, `N`/`n`, ...).
    pub fn command(self, letter: char) -> char {
        match self {
            Pointer::One => letter.to_ascii_uppercase(),
            Pointer::Two => letter.to_ascii_lowercase(),
        }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl FromStr for Pointer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1" => Ok(Pointer::One),
            "2" => Ok(Pointer::Two),
            _ => Err(Error::InvalidPointer(s.to_string())),
        }
    }
}

/// Conversion into a validated [`Pointer`].
///
/// Accepts exactly `1`, `2`, `'1'`, `'2'`, `"1"` and `"2"`. Anything else
/// is [`Error::InvalidPointer`] carrying the offending value's text form.
pub trait IntoPointer {
    /// Validate and convert.
    fn into_pointer(self) -> Result<Pointer>;
}

impl IntoPointer for Pointer {
    fn into_pointer(self) -> Result<Pointer> {
        Ok(self)
    }
}

impl IntoPointer for i32 {
    fn into_pointer(self) -> Result<Pointer> {
        match self {
            1 => Ok(Pointer::One),
            2 => Ok(Pointer::Two),
            n => Err(Error::InvalidPointer(n.to_string())),
        }
    }
}

impl IntoPointer for u8 {
    fn into_pointer(self) -> Result<Pointer> {
        i32::from(self).into_pointer()
    }
}

impl IntoPointer for char {
    fn into_pointer(self) -> Result<Pointer> {
        match self {
            '1' => Ok(Pointer::One),
            '2' => Ok(Pointer::Two),
            c => Err(Error::InvalidPointer(c.to_string())),
        }
    }
}

impl IntoPointer for &str {
    fn into_pointer(self) -> Result<Pointer> {
        self.parse()
    }
}

impl IntoPointer for String {
    fn into_pointer(self) -> Result<Pointer> {
        self.parse()
    }
}

/// A value that can be sent as a logger timestamp (`YYMMDDHHMMSS`).
///
/// Structured timestamps are formatted; literal text is validated as-is.
/// Text of the wrong length is [`Error::InvalidDate`]; text of the right
/// length that is not a calendar date is [`Error::InvalidParameter`].
pub trait LoggerDate {
    /// Serialize to the 12-character wire form.
    fn to_logger_date(&self) -> Result<String>;
}

impl LoggerDate for NaiveDateTime {
    fn to_logger_date(&self) -> Result<String> {
        Ok(self.format(DATE_FORMAT).to_string())
    }
}

impl<Tz: TimeZone> LoggerDate for DateTime<Tz> {
    fn to_logger_date(&self) -> Result<String> {
        self.naive_local().to_logger_date()
    }
}

impl LoggerDate for str {
    fn to_logger_date(&self) -> Result<String> {
        let len = self.chars().count();
        if len != DATE_LEN {
            return Err(Error::InvalidDate {
                len,
                text: self.to_string(),
            });
        }
        NaiveDateTime::parse_from_str(self, DATE_FORMAT).map_err(|e| {
            Error::InvalidParameter(format!(
                "date {self:?} is not a valid YYMMDDHHMMSS timestamp ({e})"
            ))
        })?;
        Ok(self.to_string())
    }
}

impl LoggerDate for String {
    fn to_logger_date(&self) -> Result<String> {
        self.as_str().to_logger_date()
    }
}

impl<T: LoggerDate + ?Sized> LoggerDate for &T {
    fn to_logger_date(&self) -> Result<String> {
        (**self).to_logger_date()
    }
}

/// Parse a `YYMMDDHHMMSS` timestamp received from the logger.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the text is not a valid timestamp.
pub fn parse_logger_date(text: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| Error::Protocol(format!("invalid logger timestamp {text:?} ({e})")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn address_from_number_is_zero_padded() {
        assert_eq!(Address::new(1).unwrap().as_str(), "01");
        assert_eq!(Address::new(42).unwrap().as_str(), "42");
    }

    #[test]
    fn address_out_of_range() {
        let err = Address::new(100).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn address_parse() {
        assert_eq!("07".parse::<Address>().unwrap().as_str(), "07");
        assert!("7".parse::<Address>().is_err());
        assert!("ab".parse::<Address>().is_err());
        assert_eq!(Address::default().to_string(), "01");
    }

    #[test]
    fn pointer_accepts_numeric_and_text_forms() {
        assert_eq!(1i32.into_pointer().unwrap(), Pointer::One);
        assert_eq!(2i32.into_pointer().unwrap(), Pointer::Two);
        assert_eq!('1'.into_pointer().unwrap(), Pointer::One);
        assert_eq!("2".into_pointer().unwrap(), Pointer::Two);
        assert_eq!(2u8.into_pointer().unwrap(), Pointer::Two);
        assert_eq!(String::from("1").into_pointer().unwrap(), Pointer::One);
    }

    #[test]
    fn pointer_rejects_other_values() {
        for err in [
            5i32.into_pointer().unwrap_err(),
            "5".into_pointer().unwrap_err(),
            '5'.into_pointer().unwrap_err(),
        ] {
            assert!(matches!(err, Error::InvalidPointer(ref v) if v == "5"));
            assert!(err.to_string().contains('5'));
        }
        assert!("one".into_pointer().is_err());
        assert!(0i32.into_pointer().is_err());
    }

    #[test]
    fn pointer_command_letter_case() {
        assert_eq!(Pointer::One.command('c'), 'C');
        assert_eq!(Pointer::Two.command('C'), 'c');
        assert_eq!(Pointer::Two.command('E'), 'e');
    }

    #[test]
    fn date_from_datetime() {
        let date = NaiveDate::from_ymd_opt(2020, 9, 4)
            .unwrap()
            .and_hms_opt(17, 20, 0)
            .unwrap();
        assert_eq!(date.to_logger_date().unwrap(), "200904172000");
    }

    #[test]
    fn date_from_text() {
        assert_eq!("200904172000".to_logger_date().unwrap(), "200904172000");
    }

    #[test]
    fn date_wrong_length_names_length_and_pattern() {
        let err = "200904172".to_logger_date().unwrap_err();
        assert!(matches!(err, Error::InvalidDate { len: 9, .. }));
        let msg = err.to_string();
        assert!(msg.contains('9'));
        assert!(msg.contains("YYMMDDHHMMSS"));
    }

    #[test]
    fn date_iso_text_rejected() {
        let err = "2020-09-04 19:47:00".to_logger_date().unwrap_err();
        assert!(err.to_string().contains("19"));
    }

    #[test]
    fn date_not_a_calendar_date() {
        let err = "201399999999".to_logger_date().unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn parse_date_round_trip() {
        let parsed = parse_logger_date("200904172000").unwrap();
        assert_eq!(parsed.to_logger_date().unwrap(), "200904172000");
        assert!(parse_logger_date("garbage").is_err());
    }
}
