//! Index registration state
//!
//! Tracks which field paths have an index in which namespace. One registry
//! belongs to one `StoreHandle`; repositories opened from the same handle
//! share it, repositories on another handle never see it.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::namespace::Namespace;
use crate::record::FieldPath;

/// Per-handle set of `(namespace, field path)` registrations
#[derive(Debug, Default)]
pub struct IndexRegistry {
    registered: Mutex<HashMap<String, BTreeSet<FieldPath>>>,
}

impl IndexRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, BTreeSet<FieldPath>>> {
        match self.registered.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register `field` in `namespace`.
    ///
    /// Returns true if this call created the registration, false if it
    /// already existed.
    pub fn ensure(&self, namespace: &Namespace, field: &FieldPath) -> bool {
        self.guard()
            .entry(namespace.prefix().to_string())
            .or_default()
            .insert(field.clone())
    }

    /// Returns true if `field` is registered in `namespace`
    pub fn is_registered(&self, namespace: &Namespace, field: &FieldPath) -> bool {
        self.guard()
            .get(namespace.prefix())
            .map(|fields| fields.contains(field))
            .unwrap_or(false)
    }

    /// Registered fields of `namespace`, in path order
    pub fn fields(&self, namespace: &Namespace) -> Vec<FieldPath> {
        self.guard()
            .get(namespace.prefix())
            .map(|fields| fields.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Total registrations across all namespaces
    pub fn len(&self) -> usize {
        self.guard().values().map(BTreeSet::len).sum()
    }

    /// Returns true if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
