//! Bounded traversal of the logger's event storage.
//!
//! An [`EventReader`] is created by
//! [`CombilogLogger::events`](crate::logger::CombilogLogger::events). It
//! knows how many events the logger announced up front and yields exactly
//! that many, one telegram per record.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use tracing::info;

use combilog_core::error::{Error, Result};
use combilog_core::events::LoggerEvent;
use combilog_core::types::Pointer;

use crate::fields::EventRecord;
use crate::logger::CombilogLogger;

/// Pull-based iterator over stored events.
///
/// Holds the driver mutably for its whole lifetime. After an error the
/// reader is finished and yields `None`.
pub struct EventReader<'a> {
    logger: &'a mut CombilogLogger,
    pointer: Pointer,
    total: u32,
    read: u32,
    verbose: bool,
    done: bool,
}

impl<'a> EventReader<'a> {
    pub(crate) fn new(
        logger: &'a mut CombilogLogger,
        pointer: Pointer,
        total: u32,
        verbose: bool,
    ) -> Self {
        EventReader {
            logger,
            pointer,
            total,
            read: 0,
            verbose,
            done: total == 0,
        }
    }

    /// Number of events announced when the traversal started.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Events not yet read.
    pub fn remaining(&self) -> u32 {
        if self.done {
            0
        } else {
            self.total - self.read
        }
    }

    /// Read the next event, or `None` once all announced events are read.
    pub async fn next_event(&mut self) -> Option<Result<EventRecord>> {
        if self.done {
            return None;
        }

        let result = self.logger.read_event_at(self.pointer).await;
        match result {
            Ok(record) => {
                self.read += 1;
                if self.read >= self.total {
                    self.done = true;
                }
                if self.verbose {
                    info!("reading event {} of {}", self.read, self.total);
                    self.logger.emit(LoggerEvent::ReadProgress {
                        pointer: self.pointer,
                        current: self.read,
                        total: self.total,
                    });
                }
                Some(Ok(record))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Shape of a full download returned by
/// [`read_logger`](crate::logger::CombilogLogger::read_logger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Values keyed by timestamp.
    #[default]
    Mapping,
    /// Full records in read order.
    List,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dict" | "mapping" => Ok(OutputFormat::Mapping),
            "list" => Ok(OutputFormat::List),
            other => Err(Error::InvalidParameter(format!(
                "unknown output format {other:?}, only \"dict\" and \"list\" are allowed"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Mapping => f.write_str("dict"),
            OutputFormat::List => f.write_str("list"),
        }
    }
}

/// A downloaded event log.
#[derive(Debug, Clone, PartialEq)]
pub enum LogData {
    /// Channel values keyed by event timestamp. A later event with the
    /// same timestamp replaces an earlier one.
    Mapping(BTreeMap<NaiveDateTime, Vec<f64>>),
    List(Vec<EventRecord>),
}

impl LogData {
    pub(crate) fn from_records(records: Vec<EventRecord>, format: OutputFormat) -> Self {
        match format {
            OutputFormat::Mapping => LogData::Mapping(
                records
                    .into_iter()
                    .map(|r| (r.timestamp, r.values))
                    .collect(),
            ),
            OutputFormat::List => LogData::List(records),
        }
    }

    /// Number of distinct entries.
    pub fn len(&self) -> usize {
        match self {
            LogData::Mapping(map) => map.len(),
            LogData::List(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use combilog_core::types::Address;
    use combilog_test_harness::MockTransport;

    use crate::builder::LoggerBuilder;

    const EVENT_A: &[u8] = b"$1200904172000;42493CD3;00000000;\r";
    const EVENT_B: &[u8] = b"$1200904172010;00000000;42493CD3;\r";

    async fn make_test_logger(mock: MockTransport) -> CombilogLogger {
        LoggerBuilder::new()
            .address(Address::default())
            .command_timeout(Duration::from_millis(500))
            .build_with_transport(Box::new(mock))
            .await
            .unwrap()
    }

    #[test]
    fn output_format_parse() {
        assert_eq!("dict".parse::<OutputFormat>().unwrap(), OutputFormat::Mapping);
        assert_eq!("mapping".parse::<OutputFormat>().unwrap(), OutputFormat::Mapping);
        assert_eq!("list".parse::<OutputFormat>().unwrap(), OutputFormat::List);
        let msg = "abc".parse::<OutputFormat>().unwrap_err().to_string();
        assert!(msg.contains("dict"));
        assert!(msg.contains("list"));
    }

    #[tokio::test]
    async fn reader_yields_announced_count() {
        let mut mock = MockTransport::new();
        mock.expect(b"$01N\r", b"$2\r");
        mock.expect(b"$01E\r", EVENT_A);
        mock.expect(b"$01E\r", EVENT_B);
        let mut logger = make_test_logger(mock).await;

        let mut reader = logger.events(1, false).await.unwrap();
        assert_eq!(reader.total(), 2);
        assert!(reader.next_event().await.unwrap().is_ok());
        assert_eq!(reader.remaining(), 1);
        assert!(reader.next_event().await.unwrap().is_ok());
        assert!(reader.next_event().await.is_none());
        assert_eq!(reader.remaining(), 0);
    }

    #[tokio::test]
    async fn reader_empty_log() {
        let mut mock = MockTransport::new();
        mock.expect(b"$01n\r", b"$0\r");
        let mut logger = make_test_logger(mock).await;

        let mut reader = logger.events(2, true).await.unwrap();
        assert!(reader.next_event().await.is_none());
    }

    #[tokio::test]
    async fn reader_stops_after_error() {
        let mut mock = MockTransport::new();
        mock.expect(b"$01N\r", b"$3\r");
        mock.expect(b"$01E\r", b"$1200904172000;4249;\r");
        let mut logger = make_test_logger(mock).await;

        let mut reader = logger.events(1, false).await.unwrap();
        assert!(reader.next_event().await.unwrap().is_err());
        assert!(reader.next_event().await.is_none());
    }

    #[tokio::test]
    async fn read_logger_huge_count_fails_on_read() {
        let mut mock = MockTransport::new();
        mock.expect(b"$01N\r", b"$4294967295\r");
        mock.expect(b"$01E\r", b"$1200904172000;4249;\r");
        let mut logger = make_test_logger(mock).await;

        let result = logger.read_logger(1, false, OutputFormat::List).await;
        assert!(matches!(result.unwrap_err(), Error::Decode(_)));
    }

    #[tokio::test]
    async fn read_logger_mapping() {
        let mut mock = MockTransport::new();
        mock.expect(b"$01N\r", b"$2\r");
        mock.expect(b"$01E\r", EVENT_A);
        mock.expect(b"$01E\r", EVENT_B);
        let mut logger = make_test_logger(mock).await;

        let data = logger
            .read_logger(1, false, OutputFormat::Mapping)
            .await
            .unwrap();
        let LogData::Mapping(map) = data else {
            panic!("expected mapping");
        };
        let values: Vec<_> = map.values().cloned().collect();
        assert_eq!(values, vec![vec![50.31, 0.0], vec![0.0, 50.31]]);
    }

    #[tokio::test]
    async fn read_logger_list_pointer_two() {
        let mut mock = MockTransport::new();
        mock.expect(b"$01n\r", b"$1\r");
        mock.expect(b"$01e\r", EVENT_A);
        let mut logger = make_test_logger(mock).await;

        let data = logger
            .read_logger("2", false, "list".parse().unwrap())
            .await
            .unwrap();
        let LogData::List(records) = data else {
            panic!("expected list");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, 1);
    }

    #[tokio::test]
    async fn read_logger_duplicate_timestamps_collapse() {
        let mut mock = MockTransport::new();
        mock.expect(b"$01N\r", b"$2\r");
        mock.expect(b"$01E\r", EVENT_A);
        mock.expect(b"$01E\r", b"$1200904172000;00000000;00000000;\r");
        let mut logger = make_test_logger(mock).await;

        let data = logger
            .read_logger(1, false, OutputFormat::Mapping)
            .await
            .unwrap();
        assert_eq!(data.len(), 1);
        let LogData::Mapping(map) = data else {
            panic!("expected mapping");
        };
        assert_eq!(map.values().next().unwrap(), &vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn read_logger_verbose_reports_progress() {
        let mut mock = MockTransport::new();
        mock.expect(b"$01N\r", b"$2\r");
        mock.expect(b"$01E\r", EVENT_A);
        mock.expect(b"$01E\r", EVENT_B);
        let mut logger = make_test_logger(mock).await;
        let mut rx = logger.subscribe();

        logger
            .read_logger(1, true, OutputFormat::List)
            .await
            .unwrap();

        for current in 1..=2 {
            assert_eq!(
                rx.try_recv().unwrap(),
                LoggerEvent::ReadProgress {
                    pointer: Pointer::One,
                    current,
                    total: 2,
                }
            );
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn read_logger_quiet_reports_nothing() {
        let mut mock = MockTransport::new();
        mock.expect(b"$01N\r", b"$1\r");
        mock.expect(b"$01E\r", EVENT_A);
        let mut logger = make_test_logger(mock).await;
        let mut rx = logger.subscribe();

        logger
            .read_logger(1, false, OutputFormat::List)
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn read_logger_invalid_pointer() {
        let mut logger = make_test_logger(MockTransport::new()).await;
        let err = logger
            .read_logger("5", false, OutputFormat::Mapping)
            .await
            .unwrap_err();
        assert!(err.to_string().contains('5'));
    }
}
