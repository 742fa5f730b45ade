//! In-memory ordered store
//!
//! BTreeMap behind a tokio `RwLock`. Batches apply under one write guard, so
//! they are atomic with respect to every other call. Scans snapshot the
//! requested interval and then stream it, so a scan never observes a
//! half-applied batch.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use futures_util::{stream, StreamExt};
use serde_json::Value;
use tokio::sync::RwLock;

use super::{BatchOp, KeyRange, OrderedStore, ScanStream, StorageResult, StoreFuture};

/// Ordered store kept entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Returns true if no keys are held
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    /// All keys in order (inspection only)
    pub async fn keys(&self) -> Vec<String> {
        self.data.read().await.keys().cloned().collect()
    }
}

impl OrderedStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Value>> {
        Box::pin(async move { Ok(self.data.read().await.get(key).cloned()) })
    }

    fn put(&self, key: String, value: Value) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.data.write().await.insert(key, value);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.data.write().await.remove(key);
            Ok(())
        })
    }

    fn batch(&self, ops: Vec<BatchOp>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut data = self.data.write().await;
            for op in ops {
                match op {
                    BatchOp::Put { key, value } => {
                        data.insert(key, value);
                    }
                    BatchOp::Delete { key } => {
                        data.remove(&key);
                    }
                }
            }
            Ok(())
        })
    }

    fn scan(&self, range: KeyRange) -> ScanStream {
        let data = Arc::clone(&self.data);
        let entries = async move {
            if range.start >= range.end {
                return stream::iter(Vec::new());
            }
            let data = data.read().await;
            let bounds = (
                Bound::Included(range.start.as_str()),
                Bound::Excluded(range.end.as_str()),
            );
            let snapshot: Vec<StorageResult<(String, Value)>> = data
                .range::<str, _>(bounds)
                .map(|(k, v)| Ok((k.clone(), v.clone())))
                .collect();
            stream::iter(snapshot)
        };
        Box::pin(stream::once(entries).flatten())
    }
}
