//! Ordered store contract for aerorepo
//!
//! The repository never touches a disk. It drives an external ordered
//! key-value engine through the `OrderedStore` trait and treats durability,
//! atomicity of single calls and on-disk format as that engine's concern.
//!
//! # Contract
//!
//! - Point `get` / `put` / `delete` by key
//! - `batch` applies every operation or none (atomic per call)
//! - `scan` yields a lazy, key-ordered sequence over a half-open interval
//! - Keys order byte-lexicographically (Rust `String` ordering)
//!
//! `MemoryStore` is the reference engine used by the tests and by embedders
//! that need no persistence.

mod errors;
mod handle;
mod memory;

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;
use serde_json::Value;

pub use errors::{StorageError, StorageResult};
pub use handle::StoreHandle;
pub use memory::MemoryStore;

/// Boxed future returned by store operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StorageResult<T>> + Send + 'a>>;

/// Lazy ordered sequence of `(key, value)` pairs produced by a scan
pub type ScanStream = Pin<Box<dyn Stream<Item = StorageResult<(String, Value)>> + Send + 'static>>;

/// A single write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Insert or overwrite a key
    Put { key: String, value: Value },
    /// Remove a key (absent keys are not an error)
    Delete { key: String },
}

impl BatchOp {
    /// Create a put operation
    pub fn put(key: impl Into<String>, value: Value) -> Self {
        BatchOp::Put {
            key: key.into(),
            value,
        }
    }

    /// Create a delete operation
    pub fn delete(key: impl Into<String>) -> Self {
        BatchOp::Delete { key: key.into() }
    }

    /// Key touched by this operation
    pub fn key(&self) -> &str {
        match self {
            BatchOp::Put { key, .. } => key,
            BatchOp::Delete { key } => key,
        }
    }
}

/// Half-open key interval `[start, end)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    /// Inclusive lower bound
    pub start: String,
    /// Exclusive upper bound
    pub end: String,
}

impl KeyRange {
    /// Create a range from its bounds
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Returns true if `key` falls inside the range
    pub fn contains(&self, key: &str) -> bool {
        key >= self.start.as_str() && key < self.end.as_str()
    }
}

/// An ordered key-value engine
pub trait OrderedStore: Send + Sync {
    /// Read one key; `None` when absent
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<Value>>;

    /// Write one key
    fn put(&self, key: String, value: Value) -> StoreFuture<'_, ()>;

    /// Remove one key; absent keys succeed
    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;

    /// Apply all operations atomically
    fn batch(&self, ops: Vec<BatchOp>) -> StoreFuture<'_, ()>;

    /// Scan `range` in ascending key order
    fn scan(&self, range: KeyRange) -> ScanStream;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_range_is_half_open() {
        let range = KeyRange::new("b", "d");
        assert!(!range.contains("a"));
        assert!(range.contains("b"));
        assert!(range.contains("c\u{0}zzz"));
        assert!(!range.contains("d"));
    }

    #[test]
    fn test_batch_op_key() {
        assert_eq!(BatchOp::put("k1", json!(1)).key(), "k1");
        assert_eq!(BatchOp::delete("k2").key(), "k2");
    }
}
