//! Logged events and their identifiers.
//!
//! This module provides:
//! - [`EventId`] - Identifier of a parsed event, unique within a parse session
//! - [`IdAllocator`] - Monotonic id source owned by a parse session
//! - [`LogEvent`] - Immutable record of one matched log entry

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::clock::VectorTimestamp;

/// Identifier of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out strictly increasing event ids.
///
/// One allocator belongs to one parse session, so independent parses never
/// share identifier state.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Creates an allocator starting at id 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Returns the next id.
    pub fn allocate(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }

    /// Returns the number of ids handed out so far.
    #[must_use]
    pub const fn allocated(&self) -> u64 {
        self.next
    }
}

/// One event extracted from a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    id: EventId,
    text: String,
    timestamp: VectorTimestamp,
    line: usize,
    fields: BTreeMap<String, String>,
}

impl LogEvent {
    /// Creates an event. The owning host is taken from `timestamp`.
    #[must_use]
    pub fn new(
        id: EventId,
        text: impl Into<String>,
        timestamp: VectorTimestamp,
        line: usize,
        fields: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            timestamp,
            line,
            fields,
        }
    }

    /// Returns the event id.
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.id
    }

    /// Returns the captured event text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the host that logged the event.
    #[must_use]
    pub fn host(&self) -> &str {
        self.timestamp.host()
    }

    /// Returns the event's vector timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> &VectorTimestamp {
        &self.timestamp
    }

    /// Returns the 1-indexed line the match started on.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// Returns the extra named captures of the match.
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Returns a single extra field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}
