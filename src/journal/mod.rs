//! Event journal for aerorepo
//!
//! Append-only log of one entry per mutating call, written before the state
//! change it describes.
//!
//! # Invariants
//!
//! - Entries are never rewritten
//! - Each entry is durable before the corresponding primary write starts;
//!   if the append fails, the primary write is never attempted
//! - Keys are `primary_key \0 uuid`: entries for one record sort together,
//!   but in random-suffix order, not creation order. Use `time` for ordering.
//!
//! # Non-guarantees
//!
//! - Journal and records are not written atomically. A primary write that
//!   fails after a successful append leaves an orphaned entry behind.

mod event;

use std::sync::Arc;

use futures_util::StreamExt;
use uuid::Uuid;

pub use event::{EventKind, JournalEvent};

use crate::namespace::{Namespace, Partition};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::repository::{RepositoryError, RepositoryResult};
use crate::store::{BatchOp, KeyRange, OrderedStore, StorageError};

/// Journal of one namespace
#[derive(Clone)]
pub struct EventJournal {
    store: Arc<dyn OrderedStore>,
    namespace: Namespace,
    partition: Partition,
    metrics: Arc<MetricsRegistry>,
}

impl EventJournal {
    /// Bind a journal to `namespace`'s event partition
    pub fn new(
        store: Arc<dyn OrderedStore>,
        namespace: Namespace,
        event_namespace: &str,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let partition = namespace.partition(event_namespace);
        Self {
            store,
            namespace,
            partition,
            metrics,
        }
    }

    fn entry_key(&self, id: &str) -> String {
        self.partition
            .compound_key(&[id, &Uuid::new_v4().to_string()])
    }

    fn entry(&self, event: &JournalEvent) -> RepositoryResult<BatchOp> {
        let value = serde_json::to_value(event).map_err(|e| {
            RepositoryError::validation(format!("event for {} is not serializable: {}", event.id, e))
        })?;
        Ok(BatchOp::put(self.entry_key(&event.id), value))
    }

    /// Append one event
    pub async fn append(&self, event: &JournalEvent) -> RepositoryResult<()> {
        self.append_all(std::slice::from_ref(event)).await
    }

    /// Append several events in one atomic batch
    pub async fn append_all(&self, events: &[JournalEvent]) -> RepositoryResult<()> {
        if events.is_empty() {
            return Ok(());
        }
        let ops = events
            .iter()
            .map(|event| self.entry(event))
            .collect::<RepositoryResult<Vec<_>>>()?;

        self.store.batch(ops).await?;
        self.metrics.add_events(events.len() as u64);

        let namespace = self.namespace.to_string();
        let count = events.len().to_string();
        log_event_with_fields(
            Event::JournalAppend,
            &[
                ("namespace", namespace.as_str()),
                ("kind", events[0].name.as_str()),
                ("count", count.as_str()),
            ],
        );
        Ok(())
    }

    /// Entries for one primary key, in key order
    pub async fn events_for(&self, id: &str) -> RepositoryResult<Vec<JournalEvent>> {
        self.read_range(self.partition.group(&[id])).await
    }

    /// Every entry in the namespace, grouped by primary key
    pub async fn all(&self) -> RepositoryResult<Vec<JournalEvent>> {
        self.read_range(self.partition.range()).await
    }

    async fn read_range(&self, range: KeyRange) -> RepositoryResult<Vec<JournalEvent>> {
        self.metrics.increment_range_scans();
        let mut scan = self.store.scan(range);
        let mut events = Vec::new();
        while let Some(entry) = scan.next().await {
            let (key, value) = entry?;
            let event: JournalEvent = serde_json::from_value(value)
                .map_err(|e| StorageError::corrupted(key, e.to_string()))?;
            events.push(event);
        }
        self.metrics.add_entries_scanned(events.len() as u64);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn journal(store: &MemoryStore) -> EventJournal {
        EventJournal::new(
            Arc::new(store.clone()),
            Namespace::root("main").unwrap(),
            "~events",
            Arc::new(MetricsRegistry::new()),
        )
    }

    #[tokio::test]
    async fn test_events_grouped_by_id() {
        let store = MemoryStore::new();
        let journal = journal(&store);

        journal.append(&JournalEvent::removed("a")).await.unwrap();
        journal.append(&JournalEvent::removed("b")).await.unwrap();
        journal
            .append(&JournalEvent::updated("a", json!({"x": 1}).as_object().cloned().unwrap(), None))
            .await
            .unwrap();

        let a = journal.events_for("a").await.unwrap();
        assert_eq!(a.len(), 2);
        assert!(a.iter().all(|e| e.id == "a"));

        assert_eq!(journal.all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_prefix_ids_do_not_collide() {
        let store = MemoryStore::new();
        let journal = journal(&store);

        journal.append(&JournalEvent::removed("1")).await.unwrap();
        journal.append(&JournalEvent::removed("10")).await.unwrap();

        assert_eq!(journal.events_for("1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_append_all_uses_one_batch_key_per_event() {
        let store = MemoryStore::new();
        let journal = journal(&store);
        let record = json!({"id": "1"}).as_object().cloned().unwrap();

        journal
            .append_all(&[
                JournalEvent::created("1", record.clone()),
                JournalEvent::created("1", record),
            ])
            .await
            .unwrap();

        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_corrupted_entry_is_storage_error() {
        let store = MemoryStore::new();
        let journal = journal(&store);
        let ns = Namespace::root("main").unwrap();
        store
            .put(ns.partition("~events").compound_key(&["a", "x"]), json!(17))
            .await
            .unwrap();

        let err = journal.events_for("a").await.unwrap_err();
        assert!(err.is_storage());
    }
}
