//! Journal event types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Kind of mutation an event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// store() created the record
    #[serde(rename = "record created")]
    Created,
    /// update() merged a delta into the record
    #[serde(rename = "record updated")]
    Updated,
    /// remove() deleted the record
    #[serde(rename = "record removed")]
    Removed,
}

impl EventKind {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "record created",
            EventKind::Updated => "record updated",
            EventKind::Removed => "record removed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable journal entry
///
/// Created events carry the full encoded record, updated events the raw
/// pre-merge delta (and the nested path it targets, if any), removed events
/// no payload. `time` is captured when the event is built, before it is
/// written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEvent {
    /// Event kind
    pub name: EventKind,

    /// Primary key of the subject record
    pub id: String,

    /// Full record (created events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<Record>,

    /// Pre-merge delta (updated events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<Record>,

    /// Nested path the delta targets (updated events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Time the event was built
    pub time: DateTime<Utc>,
}

impl JournalEvent {
    /// A created event carrying the full record
    pub fn created(id: impl Into<String>, record: Record) -> Self {
        Self {
            name: EventKind::Created,
            id: id.into(),
            record: Some(record),
            delta: None,
            path: None,
            time: Utc::now(),
        }
    }

    /// An updated event carrying the raw delta
    pub fn updated(id: impl Into<String>, delta: Record, path: Option<String>) -> Self {
        Self {
            name: EventKind::Updated,
            id: id.into(),
            record: None,
            delta: Some(delta),
            path,
            time: Utc::now(),
        }
    }

    /// A removed event with no payload
    pub fn removed(id: impl Into<String>) -> Self {
        Self {
            name: EventKind::Removed,
            id: id.into(),
            record: None,
            delta: None,
            path: None,
            time: Utc::now(),
        }
    }
}
