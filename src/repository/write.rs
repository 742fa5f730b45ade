//! Write path
//!
//! Every mutation follows the same order:
//!
//! 1. Validate input (nothing written on failure)
//! 2. Append the journal entry (nothing else written on failure)
//! 3. Read-modify-write the record and its index entries in one batch
//!
//! A failure in step 3 leaves the journal entry in place and is logged as
//! `JOURNAL_ORPHANED`.

use futures_util::StreamExt;
use serde_json::Value;
use uuid::Uuid;

use super::errors::{RepositoryError, RepositoryResult};
use super::Repository;
use crate::index::IndexMode;
use crate::journal::JournalEvent;
use crate::namespace::validate_component;
use crate::observability::{log_event_with_fields, Event, ObservationScope};
use crate::record::{primary_key_of, FieldPath, Record};
use crate::store::BatchOp;

/// Keys deleted per batch by drop()
const DROP_BATCH_SIZE: usize = 512;

impl Repository {
    /// Persist `records`, journaling one created event per record.
    ///
    /// Records without a primary key get a random UUID. Returns the stored
    /// records, decoded, in input order.
    pub async fn store(&self, records: Vec<Record>) -> RepositoryResult<Vec<Record>> {
        let result = self.store_inner(records).await;
        self.log_failure("store", &result);
        result
    }

    async fn store_inner(&self, records: Vec<Record>) -> RepositoryResult<Vec<Record>> {
        let field = self.options.primary_key.as_str();
        let mut prepared = Vec::with_capacity(records.len());
        for mut record in records {
            if primary_key_of(&record, field)?.is_none() {
                record.insert(field.to_string(), Value::String(Uuid::new_v4().to_string()));
            }
            let encoded = self.options.codec.encode(record);
            let id = primary_key_of(&encoded, field)?.ok_or_else(|| {
                RepositoryError::validation(format!("encoder removed primary key field {}", field))
            })?;
            prepared.push((id, encoded));
        }
        if prepared.is_empty() {
            return Ok(Vec::new());
        }

        let events: Vec<JournalEvent> = prepared
            .iter()
            .map(|(id, record)| JournalEvent::created(id.as_str(), record.clone()))
            .collect();
        self.journal.append_all(&events).await?;

        let mut ops = Vec::new();
        for (id, record) in &prepared {
            ops.extend(self.indexes.entries_for(id, record));
        }
        let index_entries = ops.len();
        for (id, record) in &prepared {
            ops.push(BatchOp::put(self.records.key(id), Value::Object(record.clone())));
        }
        self.commit("store", ops).await?;

        let metrics = self.handle.metrics();
        metrics.add_records_written(prepared.len() as u64);
        metrics.add_index_entries(index_entries as u64);

        let namespace = self.namespace.to_string();
        let count = prepared.len().to_string();
        log_event_with_fields(
            Event::RecordsStored,
            &[("namespace", namespace.as_str()), ("count", count.as_str())],
        );

        Ok(prepared
            .into_iter()
            .map(|(_, record)| self.options.codec.decode(record))
            .collect())
    }

    /// Shallow-merge `delta` into the record with primary key `id`.
    ///
    /// The updated event is journaled before the record is read, so an
    /// update of a missing record still leaves an event behind and then
    /// fails with `NotFound`.
    pub async fn update(&self, id: &str, delta: Record) -> RepositoryResult<Record> {
        let result = self.update_inner(id, None, delta).await;
        self.log_failure("update", &result);
        result
    }

    /// Shallow-merge `delta` into the nested object at `path`.
    ///
    /// Missing or null objects along `path` are created. Any other non-object
    /// value along the way is a validation error.
    pub async fn update_at(&self, id: &str, path: &str, delta: Record) -> RepositoryResult<Record> {
        let result = match FieldPath::parse(path) {
            Ok(path) => self.update_inner(id, Some(path), delta).await,
            Err(err) => Err(err),
        };
        self.log_failure("update", &result);
        result
    }

    async fn update_inner(
        &self,
        id: &str,
        path: Option<FieldPath>,
        delta: Record,
    ) -> RepositoryResult<Record> {
        validate_component("primary key", id)?;
        let field = self.options.primary_key.as_str();
        if path.is_none() && delta.contains_key(field) {
            let next = primary_key_of(&delta, field)?;
            if next.as_deref() != Some(id) {
                return Err(RepositoryError::validation(format!(
                    "update of {} may not change primary key field {}",
                    id, field
                )));
            }
        }

        let event = JournalEvent::updated(
            id,
            delta.clone(),
            path.as_ref().map(|p| p.as_str().to_string()),
        );
        self.journal.append(&event).await?;

        let result = self.merge_and_write(id, path.as_ref(), delta).await;
        if let Err(err) = &result {
            self.log_orphaned("update", id, err);
        }
        result
    }

    async fn merge_and_write(
        &self,
        id: &str,
        path: Option<&FieldPath>,
        delta: Record,
    ) -> RepositoryResult<Record> {
        let current = self
            .query
            .read_stored(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found(id))?;

        let previous = match self.options.index_mode {
            IndexMode::Consistent => Some(current.clone()),
            IndexMode::Append => None,
        };
        let mut merged = current;
        match path {
            None => merged.extend(delta),
            Some(path) => path.merge_into(&mut merged, delta)?,
        }

        let encoded = self.options.codec.encode(merged);
        let field = self.options.primary_key.as_str();
        if primary_key_of(&encoded, field)?.as_deref() != Some(id) {
            return Err(RepositoryError::validation(format!(
                "encoder changed primary key of {}",
                id
            )));
        }

        let mut ops = match &previous {
            Some(previous) => self.indexes.retractions(id, previous, Some(&encoded)),
            None => Vec::new(),
        };
        let retracted = ops.len();
        ops.extend(self.indexes.entries_for(id, &encoded));
        let written = ops.len() - retracted;
        ops.push(BatchOp::put(self.records.key(id), Value::Object(encoded.clone())));
        self.commit("update", ops).await?;

        let metrics = self.handle.metrics();
        metrics.add_records_written(1);
        metrics.add_index_entries(written as u64);
        metrics.add_index_retractions(retracted as u64);

        let namespace = self.namespace.to_string();
        log_event_with_fields(
            Event::RecordUpdated,
            &[
                ("namespace", namespace.as_str()),
                ("id", id),
                ("path", path.map(FieldPath::as_str).unwrap_or("")),
            ],
        );
        Ok(self.options.codec.decode(encoded))
    }

    /// Delete the record with primary key `id`.
    ///
    /// Succeeds whether or not the record exists; the removed event is
    /// journaled either way.
    pub async fn remove(&self, id: &str) -> RepositoryResult<()> {
        let result = self.remove_inner(id).await;
        self.log_failure("remove", &result);
        result
    }

    async fn remove_inner(&self, id: &str) -> RepositoryResult<()> {
        validate_component("primary key", id)?;
        self.journal.append(&JournalEvent::removed(id)).await?;

        let result = self.delete_record(id).await;
        if let Err(err) = &result {
            self.log_orphaned("remove", id, err);
        }
        result
    }

    async fn delete_record(&self, id: &str) -> RepositoryResult<()> {
        let mut ops = match self.options.index_mode {
            IndexMode::Consistent => match self.query.read_stored(id).await? {
                Some(previous) => self.indexes.retractions(id, &previous, None),
                None => Vec::new(),
            },
            IndexMode::Append => Vec::new(),
        };
        let retracted = ops.len();
        ops.push(BatchOp::delete(self.records.key(id)));
        self.commit("remove", ops).await?;

        let metrics = self.handle.metrics();
        metrics.increment_records_removed();
        metrics.add_index_retractions(retracted as u64);

        let namespace = self.namespace.to_string();
        log_event_with_fields(
            Event::RecordRemoved,
            &[("namespace", namespace.as_str()), ("id", id)],
        );
        Ok(())
    }

    /// Delete every key in this namespace and every namespace below it.
    ///
    /// Records, journal entries and index entries all go. Index
    /// declarations stay registered, so the handle remains usable. Keys are
    /// deleted in fixed-size batches; a failure part way through leaves the
    /// namespace partially dropped.
    pub async fn drop(&self) -> RepositoryResult<()> {
        let namespace = self.namespace.to_string();
        let scope =
            ObservationScope::with_fields("NAMESPACE_DROP", &[("namespace", namespace.as_str())]);

        match self.delete_subtree().await {
            Ok(deleted) => {
                self.handle.metrics().increment_namespaces_dropped();
                let deleted = deleted.to_string();
                scope.complete(&[("deleted", deleted.as_str())]);
                Ok(())
            }
            Err(err) => {
                scope.fail(&err.to_string());
                Err(err)
            }
        }
    }

    async fn delete_subtree(&self) -> RepositoryResult<usize> {
        let store = self.handle.store();
        let mut scan = store.scan(self.namespace.subtree());
        let mut pending = Vec::with_capacity(DROP_BATCH_SIZE);
        let mut deleted = 0;

        while let Some(entry) = scan.next().await {
            let (key, _) = entry?;
            pending.push(BatchOp::delete(key));
            if pending.len() == DROP_BATCH_SIZE {
                deleted += pending.len();
                store.batch(std::mem::take(&mut pending)).await?;
            }
        }
        if !pending.is_empty() {
            deleted += pending.len();
            store.batch(pending).await?;
        }
        Ok(deleted)
    }

    async fn commit(&self, op: &str, ops: Vec<BatchOp>) -> RepositoryResult<()> {
        match self.handle.store().batch(ops).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let namespace = self.namespace.to_string();
                let reason = err.to_string();
                log_event_with_fields(
                    Event::JournalOrphaned,
                    &[
                        ("namespace", namespace.as_str()),
                        ("op", op),
                        ("reason", reason.as_str()),
                    ],
                );
                Err(err.into())
            }
        }
    }

    fn log_orphaned(&self, op: &str, id: &str, err: &RepositoryError) {
        // Storage failures in commit() are already reported there.
        if err.is_storage() {
            return;
        }
        let namespace = self.namespace.to_string();
        let reason = err.to_string();
        log_event_with_fields(
            Event::JournalOrphaned,
            &[
                ("namespace", namespace.as_str()),
                ("op", op),
                ("id", id),
                ("reason", reason.as_str()),
            ],
        );
    }

    fn log_failure<T>(&self, op: &str, result: &RepositoryResult<T>) {
        if let Err(err) = result {
            let namespace = self.namespace.to_string();
            let reason = err.to_string();
            log_event_with_fields(
                Event::WriteFailed,
                &[
                    ("namespace", namespace.as_str()),
                    ("op", op),
                    ("code", err.code()),
                    ("reason", reason.as_str()),
                ],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::journal::EventKind;
    use crate::repository::RepositoryOptions;
    use crate::store::{MemoryStore, StoreHandle};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn open(options: RepositoryOptions) -> Repository {
        Repository::open(&StoreHandle::new(MemoryStore::new()), options).unwrap()
    }

    #[tokio::test]
    async fn test_store_assigns_missing_primary_keys() {
        let repository = open(RepositoryOptions::new("main"));
        let stored = repository
            .store(vec![
                record(json!({"name": "a"})),
                record(json!({"id": null, "name": "b"})),
                record(json!({"id": "", "name": "c"})),
            ])
            .await
            .unwrap();

        let mut ids = Vec::new();
        for record in &stored {
            let id = record["id"].as_str().unwrap();
            assert!(Uuid::parse_str(id).is_ok());
            ids.push(id.to_string());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert_eq!(stored[1]["name"], json!("b"));
    }

    #[tokio::test]
    async fn test_store_empty_batch_writes_nothing() {
        let repository = open(RepositoryOptions::new("main"));
        assert!(repository.store(Vec::new()).await.unwrap().is_empty());
        assert!(repository.events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_rejects_bad_primary_key_before_journaling() {
        let repository = open(RepositoryOptions::new("main"));
        let err = repository
            .store(vec![record(json!({"id": "ok"})), record(json!({"id": true}))])
            .await
            .unwrap_err();

        assert_eq!(err.code(), "AERO_REPO_VALIDATION");
        assert!(repository.events().await.unwrap().is_empty());
        assert!(repository.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_merges_shallowly() {
        let repository = open(RepositoryOptions::new("main"));
        repository
            .store(vec![record(json!({"id": "a", "x": 1, "nested": {"k": 1}}))])
            .await
            .unwrap();

        let updated = repository
            .update("a", record(json!({"y": 2, "nested": {"j": 2}})))
            .await
            .unwrap();

        assert_eq!(
            updated,
            record(json!({"id": "a", "x": 1, "y": 2, "nested": {"j": 2}}))
        );
    }

    #[tokio::test]
    async fn test_update_missing_record_journals_then_fails() {
        let repository = open(RepositoryOptions::new("main"));
        let err = repository
            .update("ghost", record(json!({"x": 1})))
            .await
            .unwrap_err();

        assert_eq!(err, RepositoryError::not_found("ghost"));
        assert_eq!(err.to_string(), "could not find key ghost");
        let events = repository.events_for("ghost").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, EventKind::Updated);
    }

    #[tokio::test]
    async fn test_update_may_not_change_primary_key() {
        let repository = open(RepositoryOptions::new("main"));
        repository.store(vec![record(json!({"id": "a"}))]).await.unwrap();

        let err = repository
            .update("a", record(json!({"id": "b"})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AERO_REPO_VALIDATION");

        // Restating the same key is fine.
        repository
            .update("a", record(json!({"id": "a", "x": 1})))
            .await
            .unwrap();
        assert_eq!(repository.events_for("a").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_at_creates_missing_objects() {
        let repository = open(RepositoryOptions::new("main"));
        repository.store(vec![record(json!({"id": "a"}))]).await.unwrap();

        let updated = repository
            .update_at("a", "address.geo", record(json!({"lat": 1.5})))
            .await
            .unwrap();
        assert_eq!(
            updated,
            record(json!({"id": "a", "address": {"geo": {"lat": 1.5}}}))
        );
    }

    #[tokio::test]
    async fn test_update_at_through_scalar_fails() {
        let repository = open(RepositoryOptions::new("main"));
        repository
            .store(vec![record(json!({"id": "a", "address": "none"}))])
            .await
            .unwrap();

        let err = repository
            .update_at("a", "address.geo", record(json!({"lat": 1})))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AERO_REPO_VALIDATION");
        assert_eq!(
            repository.get_by_id("a").await.unwrap().unwrap()["address"],
            json!("none")
        );
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let repository = open(RepositoryOptions::new("main"));
        repository.store(vec![record(json!({"id": "a"}))]).await.unwrap();

        repository.remove("a").await.unwrap();
        repository.remove("a").await.unwrap();

        assert_eq!(repository.get_by_id("a").await.unwrap(), None);
        let kinds: Vec<EventKind> = repository
            .events_for("a")
            .await
            .unwrap()
            .iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(kinds.iter().filter(|k| **k == EventKind::Removed).count(), 2);
    }

    #[tokio::test]
    async fn test_drop_clears_namespace() {
        let repository = open(RepositoryOptions::new("main").with_index("tag"));
        let records: Vec<Record> = (0..(DROP_BATCH_SIZE + 10))
            .map(|i| record(json!({"id": format!("{:04}", i), "tag": "t"})))
            .collect();
        repository.store(records).await.unwrap();

        repository.drop().await.unwrap();

        assert!(repository.get_all().await.unwrap().is_empty());
        assert!(repository.events().await.unwrap().is_empty());
        assert!(repository.get_by("tag", &json!("t")).await.unwrap().is_empty());
        assert_eq!(repository.metrics().namespaces_dropped, 1);

        // Still usable afterwards, with the index still declared.
        repository.store(vec![record(json!({"id": "new", "tag": "t"}))]).await.unwrap();
        assert_eq!(repository.get_by("tag", &json!("t")).await.unwrap().len(), 1);
    }
}
