//! aerorepo - An evented, indexed, namespaced repository over ordered
//! key-value stores
//!
//! Records are JSON objects keyed by a primary-key field. Every mutation is
//! journaled before it is applied, declared fields are indexed in the same
//! batch as the record, and repositories nest into hierarchical namespaces
//! that share one store.
//!
//! ```ignore
//! use aerorepo::{MemoryStore, Repository, RepositoryOptions, StoreHandle};
//! use serde_json::json;
//!
//! let handle = StoreHandle::new(MemoryStore::new());
//! let people = Repository::open(&handle, RepositoryOptions::new("people").with_index("sex"))?;
//! people.store(vec![json!({"id": "ada", "sex": "f"}).as_object().cloned().unwrap()]).await?;
//! let women = people.get_by("sex", &json!("f")).await?;
//! ```

pub mod index;
pub mod journal;
pub mod namespace;
pub mod observability;
pub mod query;
pub mod record;
pub mod repository;
pub mod store;

pub use index::IndexMode;
pub use journal::{EventKind, JournalEvent};
pub use namespace::Namespace;
pub use record::{Codec, FieldPath, Record};
pub use repository::{
    CompletionHandler, Repository, RepositoryError, RepositoryOptions, RepositoryResult, WriteOp,
    WriteOutcome,
};
pub use store::{MemoryStore, OrderedStore, StorageError, StorageResult, StoreHandle};
