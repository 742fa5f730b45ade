//! Fan-out/join for indexed lookups
//!
//! A range scan emits primary keys; each key launches an independent point
//! read while the scan keeps going. The lookup finishes exactly once, when
//! the last of two conditions holds:
//!
//! 1. the scan has ended
//! 2. no point read is in flight
//!
//! Any error finishes the lookup immediately. Signals arriving after the
//! finish are discarded.
//!
//! Results are buffered by scan position, so the output keeps index order
//! (value, then primary key) whatever order the reads complete in.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;

use crate::repository::{RepositoryError, RepositoryResult};

/// Single-fire completion latch
#[derive(Debug)]
pub enum Latch<T> {
    /// Waiting; holds the channel the outcome goes to
    Pending(oneshot::Sender<T>),
    /// Outcome delivered; further fires are no-ops
    Fulfilled,
}

impl<T> Latch<T> {
    /// Transition pending -> fulfilled, delivering `value`.
    ///
    /// Returns false if the latch had already fired.
    pub fn fire(&mut self, value: T) -> bool {
        match mem::replace(self, Latch::Fulfilled) {
            Latch::Pending(sender) => {
                // The receiver may be gone; the transition still counts.
                let _ = sender.send(value);
                true
            }
            Latch::Fulfilled => false,
        }
    }

    /// Returns true once the latch has fired
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Latch::Fulfilled)
    }
}

struct JoinState<T> {
    in_flight: usize,
    scan_ended: bool,
    slots: Vec<Option<T>>,
    latch: Latch<RepositoryResult<Vec<T>>>,
}

impl<T> JoinState<T> {
    fn try_finish(&mut self) {
        if self.latch.is_fulfilled() || !self.scan_ended || self.in_flight > 0 {
            return;
        }
        let results = mem::take(&mut self.slots).into_iter().flatten().collect();
        self.latch.fire(Ok(results));
    }
}

/// Join point shared by the scan driver and every point read
pub struct FanOutJoin<T> {
    state: Mutex<JoinState<T>>,
}

impl<T> FanOutJoin<T> {
    /// Create a join and the receiver its outcome is delivered to
    pub fn new() -> (Arc<Self>, oneshot::Receiver<RepositoryResult<Vec<T>>>) {
        let (sender, receiver) = oneshot::channel();
        let join = Arc::new(Self {
            state: Mutex::new(JoinState {
                in_flight: 0,
                scan_ended: false,
                slots: Vec::new(),
                latch: Latch::Pending(sender),
            }),
        });
        (join, receiver)
    }

    fn guard(&self) -> MutexGuard<'_, JoinState<T>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a new point read; returns its slot.
    ///
    /// Returns `None` once the join has finished, so the driver can stop
    /// issuing reads nobody will look at.
    pub fn issue(&self) -> Option<usize> {
        let mut state = self.guard();
        if state.latch.is_fulfilled() {
            return None;
        }
        state.in_flight += 1;
        state.slots.push(None);
        Some(state.slots.len() - 1)
    }

    /// Report a finished point read. `Ok(None)` means nothing to emit.
    pub fn complete(&self, slot: usize, outcome: RepositoryResult<Option<T>>) {
        let mut state = self.guard();
        if state.latch.is_fulfilled() {
            return;
        }
        state.in_flight = state.in_flight.saturating_sub(1);
        match outcome {
            Ok(value) => {
                if let Some(entry) = state.slots.get_mut(slot) {
                    *entry = value;
                }
                state.try_finish();
            }
            Err(err) => {
                state.latch.fire(Err(err));
            }
        }
    }

    /// Report the end of the scan
    pub fn end_scan(&self) {
        let mut state = self.guard();
        state.scan_ended = true;
        state.try_finish();
    }

    /// Abort with `err` unless already finished
    pub fn fail(&self, err: RepositoryError) {
        self.guard().latch.fire(Err(err));
    }

    /// Point reads issued but not yet completed
    pub fn in_flight(&self) -> usize {
        self.guard().in_flight
    }
}
