//! Repository subsystem for aerorepo
//!
//! A `Repository` is a handle on one namespace of an ordered store. It owns
//! no data of its own: everything lives in the store under the namespace's
//! key prefix, split into three partitions.
//!
//! - records: `~records`, one entry per primary key
//! - journal: `~events` by default, one entry per mutating call
//! - indexes: `~indexes` by default, one entry per (field, value, record)
//!
//! # Invariants
//!
//! - Every mutating call appends its journal entry before touching records
//! - A record and its index entries are written in one atomic batch
//! - Records are encoded exactly once per write and decoded exactly once per
//!   read
//! - Sub-repositories share the store handle, registry and metrics of their
//!   parent and live strictly inside its key prefix
//!
//! # Non-guarantees
//!
//! - update() is a read-modify-write with no lock: concurrent updates of the
//!   same record may lose one delta (last writer wins)
//! - The journal and the records are not written atomically together

mod config;
mod detached;
mod errors;
mod write;

pub use config::RepositoryOptions;
pub use detached::{CompletionHandler, WriteOp, WriteOutcome};
pub use errors::{RepositoryError, RepositoryResult};

use serde_json::Value;

use crate::index::{IndexMaintainer, IndexMode};
use crate::journal::{EventJournal, JournalEvent};
use crate::namespace::{Namespace, Partition, RECORD_PARTITION};
use crate::observability::{log_event_with_fields, Event, MetricsSnapshot};
use crate::query::QueryEngine;
use crate::record::{FieldPath, Record};
use crate::store::StoreHandle;

/// Handle on one namespace of a store
#[derive(Clone)]
pub struct Repository {
    handle: StoreHandle,
    namespace: Namespace,
    options: RepositoryOptions,
    records: Partition,
    journal: EventJournal,
    indexes: IndexMaintainer,
    query: QueryEngine,
}

impl Repository {
    /// Open a top-level repository on `handle`.
    ///
    /// Validates `options` and registers every configured index.
    pub fn open(handle: &StoreHandle, options: RepositoryOptions) -> RepositoryResult<Self> {
        let namespace = Namespace::root(&options.namespace)?;
        Self::bind(handle.clone(), namespace, options)
    }

    /// Open a repository nested inside this one.
    ///
    /// The child shares this repository's store handle. Its key prefix
    /// extends this one, so drop() on the parent removes it too.
    pub fn sub(&self, options: RepositoryOptions) -> RepositoryResult<Self> {
        let namespace = self.namespace.child(&options.namespace)?;
        Self::bind(self.handle.clone(), namespace, options)
    }

    fn bind(
        handle: StoreHandle,
        namespace: Namespace,
        options: RepositoryOptions,
    ) -> RepositoryResult<Self> {
        let paths = options.validate()?;

        let store = handle.store().clone();
        let metrics = handle.metrics().clone();
        let records = namespace.partition(RECORD_PARTITION);
        let journal = EventJournal::new(
            store.clone(),
            namespace.clone(),
            &options.event_namespace,
            metrics.clone(),
        );
        let indexes = IndexMaintainer::new(
            namespace.clone(),
            &options.index_namespace,
            handle.registry().clone(),
        );
        for path in &paths {
            indexes.ensure_index(path);
        }
        let query = QueryEngine::new(
            store,
            namespace.clone(),
            records.clone(),
            indexes.clone(),
            options.codec.clone(),
            metrics,
        );

        let ns = namespace.to_string();
        let depth = namespace.depth().to_string();
        log_event_with_fields(
            Event::RepositoryOpened,
            &[
                ("namespace", ns.as_str()),
                ("depth", depth.as_str()),
                ("primary_key", options.primary_key.as_str()),
            ],
        );

        Ok(Self {
            handle,
            namespace,
            options,
            records,
            journal,
            indexes,
            query,
        })
    }

    /// The namespace this handle is bound to
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The store handle shared with every sub-repository
    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    pub fn primary_key(&self) -> &str {
        &self.options.primary_key
    }

    pub fn index_mode(&self) -> IndexMode {
        self.options.index_mode
    }

    /// Fields with a declared index in this namespace
    pub fn indexed_fields(&self) -> Vec<FieldPath> {
        self.indexes.declared_fields()
    }

    /// Counters of the shared store handle
    pub fn metrics(&self) -> MetricsSnapshot {
        self.handle.metrics().snapshot()
    }

    /// Declare an index on `path`.
    ///
    /// Returns true if the index is new. Records already stored are not
    /// backfilled.
    pub fn ensure_index(&self, path: &str) -> RepositoryResult<bool> {
        let path = FieldPath::parse(path)?;
        Ok(self.indexes.ensure_index(&path))
    }

    /// Record with primary key `id`, or `None`
    pub async fn get_by_id(&self, id: &str) -> RepositoryResult<Option<Record>> {
        self.query.get_by_id(id).await
    }

    /// Every record, ordered by primary key
    pub async fn get_all(&self) -> RepositoryResult<Vec<Record>> {
        self.query.get_all().await
    }

    /// Records whose `path` equals `value`, by full scan.
    ///
    /// Works on any field, indexed or not.
    pub async fn get_for(&self, path: &str, value: &Value) -> RepositoryResult<Vec<Record>> {
        let path = FieldPath::parse(path)?;
        self.query.get_for(&path, value).await
    }

    /// Records whose indexed `path` equals `value`.
    ///
    /// Fails with `NoIndex` if `path` has no declared index. In append mode
    /// the result may include records whose current value no longer matches.
    pub async fn get_by(&self, path: &str, value: &Value) -> RepositoryResult<Vec<Record>> {
        let path = FieldPath::parse(path)?;
        self.query.get_by(&path, value).await
    }

    /// Journal entries for one primary key
    pub async fn events_for(&self, id: &str) -> RepositoryResult<Vec<JournalEvent>> {
        self.journal.events_for(id).await
    }

    /// Every journal entry in this namespace
    pub async fn events(&self) -> RepositoryResult<Vec<JournalEvent>> {
        self.journal.all().await
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("namespace", &self.namespace.to_string())
            .field("primary_key", &self.options.primary_key)
            .field("index_mode", &self.options.index_mode)
            .finish()
    }
}
