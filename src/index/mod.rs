//! Secondary index subsystem for aerorepo
//!
//! Indexes are derived state persisted next to the records they describe.
//!
//! # Invariants
//!
//! - Every store() writes one entry per declared field with an indexable value
//! - Entries live in the same batch as the primary write
//! - Registration is idempotent per (store handle, namespace, field)
//!
//! # Non-guarantees
//!
//! - In the default append mode, update() adds entries for the merged
//!   record but never retracts entries for values it replaced, and remove()
//!   leaves entries behind. Lookups on a replaced value still return the
//!   record. `IndexMode::Consistent` retracts them instead.
//! - Declaring an index does not backfill existing records.
//! - Only scalar values are indexed. A declared field holding an array or
//!   an object gets no entry at all, the same as a null or missing field,
//!   so lookups never match composite values even though they are non-null.

mod key;
mod maintainer;
mod registry;

pub use key::IndexKey;
pub use maintainer::IndexMaintainer;
pub use registry::IndexRegistry;

use serde::Deserialize;

/// How update() and remove() treat index entries of replaced values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    /// Only ever add entries; stale entries stay behind
    #[default]
    Append,
    /// Retract entries for replaced or removed values in the same batch
    Consistent,
}
