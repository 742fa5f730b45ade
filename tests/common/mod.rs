//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use aerorepo::store::{BatchOp, KeyRange, ScanStream, StoreFuture};
use aerorepo::{
    MemoryStore, OrderedStore, Record, Repository, RepositoryOptions, StorageError, StoreHandle,
};
use futures_util::{stream, StreamExt};
use serde_json::Value;
use tokio::sync::Barrier;

// =============================================================================
// Records
// =============================================================================

pub fn record(value: Value) -> Record {
    value.as_object().cloned().expect("test records are objects")
}

pub fn ids(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| match &r["id"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}

pub fn open(options: RepositoryOptions) -> Repository {
    let handle = StoreHandle::new(MemoryStore::new());
    Repository::open(&handle, options).expect("valid options")
}

// =============================================================================
// Fault injection
// =============================================================================

/// Fails batches that touch a chosen partition
#[derive(Clone, Default)]
pub struct FaultInjectingStore {
    inner: MemoryStore,
    fail_partition: Arc<Mutex<Option<String>>>,
    fail_reads: Arc<AtomicBool>,
    batches: Arc<AtomicUsize>,
}

impl FaultInjectingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Fail every batch with a key in `partition` (e.g. "~events")
    pub fn fail_writes_to(&self, partition: &str) {
        *self.fail_partition.lock().unwrap() = Some(partition.to_string());
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        *self.fail_partition.lock().unwrap() = None;
        self.fail_reads(false);
    }

    /// Batches that reached the inner store
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    fn should_fail(&self, key: &str) -> bool {
        match self.fail_partition.lock().unwrap().as_deref() {
            Some(partition) => key.contains(&format!("\u{0}{}\u{0}", partition)),
            None => false,
        }
    }
}

impl OrderedStore for FaultInjectingStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Value>> {
        Box::pin(async move {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::unavailable("injected read failure"));
            }
            self.inner.get(key).await
        })
    }

    fn put(&self, key: String, value: Value) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if self.should_fail(&key) {
                return Err(StorageError::backend("injected write failure"));
            }
            self.inner.put(key, value).await
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            if self.should_fail(key) {
                return Err(StorageError::backend("injected write failure"));
            }
            self.inner.delete(key).await
        })
    }

    fn batch(&self, ops: Vec<BatchOp>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if ops.iter().any(|op| self.should_fail(op.key())) {
                return Err(StorageError::backend("injected write failure"));
            }
            self.batches.fetch_add(1, Ordering::SeqCst);
            self.inner.batch(ops).await
        })
    }

    fn scan(&self, range: KeyRange) -> ScanStream {
        if self.fail_reads.load(Ordering::SeqCst) {
            let items: Vec<Result<(String, Value), StorageError>> =
                vec![Err(StorageError::unavailable("injected read failure"))];
            return Box::pin(stream::iter(items));
        }
        self.inner.scan(range)
    }
}

// =============================================================================
// Gated reads
// =============================================================================

/// Holds record point reads at a barrier until `parties` of them arrive.
///
/// Forces concurrent read-modify-writes to interleave: every party reads
/// the same state before any of them writes.
#[derive(Clone)]
pub struct GatedStore {
    inner: MemoryStore,
    armed: Arc<AtomicBool>,
    barrier: Arc<Barrier>,
}

impl GatedStore {
    pub fn new(parties: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            armed: Arc::new(AtomicBool::new(false)),
            barrier: Arc::new(Barrier::new(parties)),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

impl OrderedStore for GatedStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Value>> {
        Box::pin(async move {
            let value = self.inner.get(key).await?;
            if self.armed.load(Ordering::SeqCst) && key.contains("\u{0}~records\u{0}") {
                self.barrier.wait().await;
            }
            Ok(value)
        })
    }

    fn put(&self, key: String, value: Value) -> StoreFuture<'_, ()> {
        self.inner.put(key, value)
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        self.inner.delete(key)
    }

    fn batch(&self, ops: Vec<BatchOp>) -> StoreFuture<'_, ()> {
        self.inner.batch(ops)
    }

    fn scan(&self, range: KeyRange) -> ScanStream {
        self.inner.scan(range)
    }
}

// =============================================================================
// Stalled scans
// =============================================================================

/// Once armed, index scans hand out a few entries and then never yield
/// again, and every record point read fails.
#[derive(Clone, Default)]
pub struct StallingStore {
    inner: MemoryStore,
    stall_after: Arc<Mutex<Option<usize>>>,
}

impl StallingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stall index scans after `entries` entries and fail record reads
    pub fn stall_after(&self, entries: usize) {
        *self.stall_after.lock().unwrap() = Some(entries);
    }

    fn armed(&self) -> Option<usize> {
        *self.stall_after.lock().unwrap()
    }
}

impl OrderedStore for StallingStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Value>> {
        Box::pin(async move {
            if self.armed().is_some() && key.contains("\u{0}~records\u{0}") {
                return Err(StorageError::unavailable("record read failed"));
            }
            self.inner.get(key).await
        })
    }

    fn put(&self, key: String, value: Value) -> StoreFuture<'_, ()> {
        self.inner.put(key, value)
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        self.inner.delete(key)
    }

    fn batch(&self, ops: Vec<BatchOp>) -> StoreFuture<'_, ()> {
        self.inner.batch(ops)
    }

    fn scan(&self, range: KeyRange) -> ScanStream {
        match self.armed() {
            Some(entries) if range.start.contains("\u{0}~indexes\u{0}") => {
                Box::pin(self.inner.scan(range).take(entries).chain(stream::pending()))
            }
            _ => self.inner.scan(range),
        }
    }
}
