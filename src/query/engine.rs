//! Query engine
//!
//! - `get_by_id`: one point read; absent is `Ok(None)`
//! - `get_all`: ordered scan of the record partition
//! - `get_for`: ordered scan + filter, O(namespace size)
//! - `get_by`: index scan + concurrent point reads, O(matches)

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;

use super::join::FanOutJoin;
use crate::index::IndexMaintainer;
use crate::namespace::{Namespace, Partition};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::record::{into_record, values_match, Codec, FieldPath, Record};
use crate::repository::RepositoryResult;
use crate::store::{OrderedStore, StorageError, StorageResult};

/// Read side of one repository
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn OrderedStore>,
    namespace: Namespace,
    records: Partition,
    indexes: IndexMaintainer,
    codec: Codec,
    metrics: Arc<MetricsRegistry>,
}

/// Interpret a stored value as a record
fn stored_record(key: &str, value: Value) -> StorageResult<Record> {
    into_record(value).map_err(|_| StorageError::corrupted(key, "stored value is not a JSON object"))
}

impl QueryEngine {
    /// Bind an engine to one namespace
    pub fn new(
        store: Arc<dyn OrderedStore>,
        namespace: Namespace,
        records: Partition,
        indexes: IndexMaintainer,
        codec: Codec,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            store,
            namespace,
            records,
            indexes,
            codec,
            metrics,
        }
    }

    /// Point read without the decode hook (write path only)
    pub(crate) async fn read_stored(&self, id: &str) -> RepositoryResult<Option<Record>> {
        let key = self.records.key(id);
        self.metrics.increment_point_reads();
        match self.store.get(&key).await? {
            Some(value) => Ok(Some(stored_record(&key, value)?)),
            None => Ok(None),
        }
    }

    /// Record with primary key `id`, decoded; `None` if absent
    pub async fn get_by_id(&self, id: &str) -> RepositoryResult<Option<Record>> {
        let record = self.read_stored(id).await?;
        let namespace = self.namespace.to_string();
        log_event_with_fields(
            Event::PointRead,
            &[
                ("namespace", namespace.as_str()),
                ("id", id),
                ("found", if record.is_some() { "true" } else { "false" }),
            ],
        );
        Ok(record.map(|r| self.codec.decode(r)))
    }

    /// Every record in primary-key order, decoded
    pub async fn get_all(&self) -> RepositoryResult<Vec<Record>> {
        self.scan_records(|_| true).await
    }

    /// Records whose `field` equals `value`, found by scanning everything
    pub async fn get_for(&self, field: &FieldPath, value: &Value) -> RepositoryResult<Vec<Record>> {
        self.scan_records(|record| field.get(record).is_some_and(|v| values_match(v, value)))
            .await
    }

    async fn scan_records<F>(&self, keep: F) -> RepositoryResult<Vec<Record>>
    where
        F: Fn(&Record) -> bool,
    {
        self.metrics.increment_range_scans();
        let mut scan = self.store.scan(self.records.range());
        let mut scanned = 0u64;
        let mut records = Vec::new();

        while let Some(entry) = scan.next().await {
            let (key, value) = entry?;
            scanned += 1;
            let record = self.codec.decode(stored_record(&key, value)?);
            if keep(&record) {
                records.push(record);
            }
        }

        self.metrics.add_entries_scanned(scanned);
        let namespace = self.namespace.to_string();
        let scanned = scanned.to_string();
        let matched = records.len().to_string();
        log_event_with_fields(
            Event::NamespaceScan,
            &[
                ("namespace", namespace.as_str()),
                ("scanned", scanned.as_str()),
                ("matched", matched.as_str()),
            ],
        );
        Ok(records)
    }

    /// Records whose indexed `field` equals `value`.
    ///
    /// Scans only the matching index entries and issues one concurrent point
    /// read per entry while the scan is still running. Results come back in
    /// index order. Entries whose record no longer exists are skipped.
    pub async fn get_by(&self, field: &FieldPath, value: &Value) -> RepositoryResult<Vec<Record>> {
        let Some(range) = self.indexes.lookup_range(field, value)? else {
            return Ok(Vec::new());
        };

        let (join, mut done) = FanOutJoin::new();
        self.metrics.increment_range_scans();
        let mut scan = self.store.scan(range);
        let mut scanned = 0u64;

        // The latch is polled ahead of the scan: once it fires, the lookup
        // is over and no further entries are pulled.
        let fired = loop {
            tokio::select! {
                biased;
                outcome = &mut done => break Some(outcome),
                entry = scan.next() => {
                    let Some(entry) = entry else {
                        break None;
                    };
                    let primary_key = match entry
                        .and_then(|(key, value)| IndexMaintainer::primary_key_of_entry(&key, &value))
                    {
                        Ok(primary_key) => primary_key,
                        Err(err) => {
                            join.fail(err.into());
                            continue;
                        }
                    };
                    scanned += 1;

                    let Some(slot) = join.issue() else {
                        continue;
                    };
                    let store = Arc::clone(&self.store);
                    let key = self.records.key(&primary_key);
                    let codec = self.codec.clone();
                    let metrics = Arc::clone(&self.metrics);
                    let join = Arc::clone(&join);
                    tokio::spawn(async move {
                        metrics.increment_point_reads();
                        let outcome: RepositoryResult<Option<Record>> = match store.get(&key).await {
                            Ok(Some(value)) => stored_record(&key, value)
                                .map(|record| Some(codec.decode(record)))
                                .map_err(Into::into),
                            Ok(None) => Ok(None),
                            Err(err) => Err(err.into()),
                        };
                        join.complete(slot, outcome);
                    });
                }
            }
        };
        drop(scan);
        self.metrics.add_entries_scanned(scanned);

        let outcome = match fired {
            Some(outcome) => outcome,
            None => {
                join.end_scan();
                // A point read that panics drops its handle; releasing ours lets
                // the receiver observe the abandoned join instead of waiting forever.
                drop(join);
                done.await
            }
        };
        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(StorageError::backend("index lookup abandoned by a point read").into()),
        };

        let namespace = self.namespace.to_string();
        let scanned = scanned.to_string();
        log_event_with_fields(
            Event::IndexLookup,
            &[
                ("namespace", namespace.as_str()),
                ("field", field.as_str()),
                ("entries", scanned.as_str()),
                ("ok", if result.is_ok() { "true" } else { "false" }),
            ],
        );
        result
    }
}
