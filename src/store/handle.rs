//! Store handle
//!
//! Bundles one engine with the state scoped to it: the index registry and
//! the metrics registry. Clones share all three; a second handle built over
//! the same engine starts with its own registry and counters.

use std::fmt;
use std::sync::Arc;

use super::OrderedStore;
use crate::index::IndexRegistry;
use crate::observability::MetricsRegistry;

/// An ordered store plus its handle-scoped state
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<dyn OrderedStore>,
    registry: Arc<IndexRegistry>,
    metrics: Arc<MetricsRegistry>,
}

impl StoreHandle {
    /// Wrap an engine in a fresh handle
    pub fn new(store: impl OrderedStore + 'static) -> Self {
        Self::from_arc(Arc::new(store))
    }

    /// Wrap a shared engine in a fresh handle
    pub fn from_arc(store: Arc<dyn OrderedStore>) -> Self {
        Self {
            store,
            registry: Arc::new(IndexRegistry::new()),
            metrics: Arc::new(MetricsRegistry::new()),
        }
    }

    /// The underlying engine
    pub fn store(&self) -> &Arc<dyn OrderedStore> {
        &self.store
    }

    /// Index registrations made through this handle
    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    /// Counters for every repository opened from this handle
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("registered_indexes", &self.registry.len())
            .finish()
    }
}
