//! Metrics registry for aerorepo
//!
//! - Counters only
//! - Monotonic increase
//! - Shared by every repository opened from one store handle

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters for one store handle
///
/// Uses Relaxed ordering; counters are exact once the counted calls have
/// completed.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    events_appended: AtomicU64,
    records_written: AtomicU64,
    records_removed: AtomicU64,
    index_entries_written: AtomicU64,
    index_entries_retracted: AtomicU64,
    point_reads: AtomicU64,
    range_scans: AtomicU64,
    entries_scanned: AtomicU64,
    namespaces_dropped: AtomicU64,
}

impl MetricsRegistry {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Count journal entries appended
    pub fn add_events(&self, n: u64) {
        self.events_appended.fetch_add(n, Ordering::Relaxed);
    }

    /// Count primary records written
    pub fn add_records_written(&self, n: u64) {
        self.records_written.fetch_add(n, Ordering::Relaxed);
    }

    /// Count a primary record removal
    pub fn increment_records_removed(&self) {
        self.records_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count index entries written
    pub fn add_index_entries(&self, n: u64) {
        self.index_entries_written.fetch_add(n, Ordering::Relaxed);
    }

    /// Count index entries retracted
    pub fn add_index_retractions(&self, n: u64) {
        self.index_entries_retracted.fetch_add(n, Ordering::Relaxed);
    }

    /// Count a point read against the store
    pub fn increment_point_reads(&self) {
        self.point_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a range scan opened against the store
    pub fn increment_range_scans(&self) {
        self.range_scans.fetch_add(1, Ordering::Relaxed);
    }

    /// Count entries yielded by range scans
    pub fn add_entries_scanned(&self, n: u64) {
        self.entries_scanned.fetch_add(n, Ordering::Relaxed);
    }

    /// Count a dropped namespace
    pub fn increment_namespaces_dropped(&self) {
        self.namespaces_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_appended: self.events_appended.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            records_removed: self.records_removed.load(Ordering::Relaxed),
            index_entries_written: self.index_entries_written.load(Ordering::Relaxed),
            index_entries_retracted: self.index_entries_retracted.load(Ordering::Relaxed),
            point_reads: self.point_reads.load(Ordering::Relaxed),
            range_scans: self.range_scans.load(Ordering::Relaxed),
            entries_scanned: self.entries_scanned.load(Ordering::Relaxed),
            namespaces_dropped: self.namespaces_dropped.load(Ordering::Relaxed),
        }
    }

    /// Snapshot rendered as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_default()
    }
}

/// Plain-value copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub events_appended: u64,
    pub records_written: u64,
    pub records_removed: u64,
    pub index_entries_written: u64,
    pub index_entries_retracted: u64,
    pub point_reads: u64,
    pub range_scans: u64,
    pub entries_scanned: u64,
    pub namespaces_dropped: u64,
}

impl MetricsSnapshot {
    /// Counter-wise difference from an earlier snapshot (saturating)
    pub fn since(&self, earlier: &MetricsSnapshot) -> MetricsSnapshot {
        MetricsSnapshot {
            events_appended: self.events_appended.saturating_sub(earlier.events_appended),
            records_written: self.records_written.saturating_sub(earlier.records_written),
            records_removed: self.records_removed.saturating_sub(earlier.records_removed),
            index_entries_written: self.index_entries_written.saturating_sub(earlier.index_entries_written),
            index_entries_retracted: self
                .index_entries_retracted
                .saturating_sub(earlier.index_entries_retracted),
            point_reads: self.point_reads.saturating_sub(earlier.point_reads),
            range_scans: self.range_scans.saturating_sub(earlier.range_scans),
            entries_scanned: self.entries_scanned.saturating_sub(earlier.entries_scanned),
            namespaces_dropped: self.namespaces_dropped.saturating_sub(earlier.namespaces_dropped),
        }
    }
}
