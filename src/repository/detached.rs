//! Detached writes
//!
//! `submit` runs a write on the runtime without the caller awaiting it. The
//! outcome goes to the repository's completion handler; failures are also
//! logged so a no-op handler never hides them.

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;

use super::errors::RepositoryResult;
use super::Repository;
use crate::observability::{log_event_with_fields, Event};
use crate::record::Record;

/// A write that can run detached
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// store() a batch of records
    Store(Vec<Record>),
    /// update() or update_at() one record
    Update {
        id: String,
        path: Option<String>,
        delta: Record,
    },
    /// remove() one record
    Remove(String),
}

impl WriteOp {
    pub fn name(&self) -> &'static str {
        match self {
            WriteOp::Store(_) => "store",
            WriteOp::Update { .. } => "update",
            WriteOp::Remove(_) => "remove",
        }
    }
}

/// Successful result of a detached write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// Stored records, decoded, in input order
    Stored(Vec<Record>),
    /// The merged record, decoded
    Updated(Record),
    Removed,
}

type Handler = Arc<dyn Fn(RepositoryResult<WriteOutcome>) + Send + Sync>;

/// Receives the outcome of every detached write
#[derive(Clone)]
pub struct CompletionHandler {
    handler: Option<Handler>,
}

impl CompletionHandler {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(RepositoryResult<WriteOutcome>) + Send + Sync + 'static,
    {
        Self {
            handler: Some(Arc::new(handler)),
        }
    }

    /// Handler that discards every outcome
    pub fn noop() -> Self {
        Self { handler: None }
    }

    pub fn is_noop(&self) -> bool {
        self.handler.is_none()
    }

    fn call(&self, outcome: RepositoryResult<WriteOutcome>) {
        if let Some(handler) = &self.handler {
            handler(outcome);
        }
    }
}

impl Default for CompletionHandler {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for CompletionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandler")
            .field("noop", &self.is_noop())
            .finish()
    }
}

impl Repository {
    /// Run `op` and wait for it
    pub async fn execute(&self, op: WriteOp) -> RepositoryResult<WriteOutcome> {
        match op {
            WriteOp::Store(records) => self.store(records).await.map(WriteOutcome::Stored),
            WriteOp::Update {
                id,
                path: None,
                delta,
            } => self.update(&id, delta).await.map(WriteOutcome::Updated),
            WriteOp::Update {
                id,
                path: Some(path),
                delta,
            } => self
                .update_at(&id, &path, delta)
                .await
                .map(WriteOutcome::Updated),
            WriteOp::Remove(id) => self.remove(&id).await.map(|_| WriteOutcome::Removed),
        }
    }

    /// Run `op` on the runtime and hand its outcome to the completion handler.
    ///
    /// Must be called from within a tokio runtime. The returned handle
    /// resolves once the handler has run.
    pub fn submit(&self, op: WriteOp) -> JoinHandle<()> {
        let repository = self.clone();
        tokio::spawn(async move {
            let name = op.name();
            let outcome = repository.execute(op).await;
            if let Err(err) = &outcome {
                let namespace = repository.namespace().to_string();
                let reason = err.to_string();
                log_event_with_fields(
                    Event::DetachedWriteFailed,
                    &[
                        ("namespace", namespace.as_str()),
                        ("op", name),
                        ("code", err.code()),
                        ("reason", reason.as_str()),
                    ],
                );
            }
            repository.options.completion.call(outcome);
        })
    }
}
