//! Asynchronous logger event types.
//!
//! Events are emitted by the driver through a `tokio::sync::broadcast`
//! channel while it works. Front ends subscribe to them to show progress
//! during long event-log downloads without polling.

use crate::types::Pointer;

/// An event emitted by the driver.
///
/// Subscribe via `CombilogLogger::subscribe()`. Events are delivered on a
/// best-effort basis through a bounded broadcast channel; slow consumers
/// may miss events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggerEvent {
    /// One event record was read during a verbose download.
    ///
    /// `current` counts from 1 up to `total`.
    ReadProgress {
        /// The pointer being traversed.
        pointer: Pointer,
        /// Index of the record just read, starting at 1.
        current: u32,
        /// Number of records announced by the logger for this traversal.
        total: u32,
    },

    /// A read pointer was repositioned.
    PointerMoved {
        /// The pointer that moved.
        pointer: Pointer,
    },

    /// The logger's event storage was erased.
    MemoryDeleted,
}
