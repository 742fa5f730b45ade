//! Observable repository events
//!
//! Every mutating call logs exactly one of these on success; reads log at
//! TRACE.

use std::fmt;

use super::logger::Severity;

/// Observable events in aerorepo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Repository handle opened on a namespace
    RepositoryOpened,
    /// Index registered for the first time on a store handle
    IndexRegistered,

    // Writes
    /// Journal entries appended
    JournalAppend,
    /// store() persisted a batch of records
    RecordsStored,
    /// update() persisted a merged record
    RecordUpdated,
    /// remove() deleted a record
    RecordRemoved,
    /// A mutating call failed
    WriteFailed,
    /// A write failed after its journal entry was durable
    JournalOrphaned,
    /// A detached write failed
    DetachedWriteFailed,

    // Reads
    /// getById() point read
    PointRead,
    /// getAll() / getFor() namespace scan
    NamespaceScan,
    /// getBy() indexed lookup
    IndexLookup,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::RepositoryOpened => "REPOSITORY_OPENED",
            Event::IndexRegistered => "INDEX_REGISTERED",

            Event::JournalAppend => "JOURNAL_APPEND",
            Event::RecordsStored => "RECORDS_STORED",
            Event::RecordUpdated => "RECORD_UPDATED",
            Event::RecordRemoved => "RECORD_REMOVED",
            Event::WriteFailed => "WRITE_FAILED",
            Event::JournalOrphaned => "JOURNAL_ORPHANED",
            Event::DetachedWriteFailed => "DETACHED_WRITE_FAILED",

            Event::PointRead => "POINT_READ",
            Event::NamespaceScan => "NAMESPACE_SCAN",
            Event::IndexLookup => "INDEX_LOOKUP",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::PointRead | Event::NamespaceScan | Event::IndexLookup | Event::JournalAppend => {
                Severity::Trace
            }
            Event::JournalOrphaned => Severity::Warn,
            Event::WriteFailed | Event::DetachedWriteFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_strings_are_unique() {
        let events = [
            Event::RepositoryOpened,
            Event::IndexRegistered,
            Event::JournalAppend,
            Event::RecordsStored,
            Event::RecordUpdated,
            Event::RecordRemoved,
            Event::WriteFailed,
            Event::JournalOrphaned,
            Event::DetachedWriteFailed,
            Event::PointRead,
            Event::NamespaceScan,
            Event::IndexLookup,
        ];

        let mut names: Vec<&str> = events.iter().map(Event::as_str).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), events.len());
    }

    #[test]
    fn test_reads_log_at_trace() {
        assert_eq!(Event::IndexLookup.severity(), Severity::Trace);
        assert_eq!(Event::RecordsStored.severity(), Severity::Info);
        assert_eq!(Event::JournalOrphaned.severity(), Severity::Warn);
    }
}
