//! Bounded FIFO queue of callers waiting for a worker.

use std::collections::VecDeque;
use std::time::Instant;

use tokio::sync::oneshot;

use crate::core::error::PoolError;
use crate::core::handle::Lease;

/// Outcome delivered to a queued caller: a lease, or a typed failure.
pub(crate) type AcquireResult<W> = Result<Lease<W>, PoolError>;

/// One caller blocked in `acquire`, waiting for capacity.
pub(crate) struct Waiter<W> {
    pub id: u64,
    pub enqueued_at: Instant,
    /// Single-fulfillment completion channel back to the caller.
    pub tx: oneshot::Sender<AcquireResult<W>>,
}

/// Strict FIFO collection of [`Waiter`]s with a hard capacity bound.
///
/// Insertion past the bound is rejected so a stalled pool cannot accumulate
/// unbounded waiters. Removal happens either from the front (FIFO service)
/// or by id (a waiter's own timeout fired); removal by id preserves the
/// relative order of the remaining entries.
pub(crate) struct WaitQueue<W> {
    entries: VecDeque<Waiter<W>>,
    max: usize,
}

impl<W> WaitQueue<W> {
    pub fn new(max: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Append a waiter. Callers must check [`is_full`](Self::is_full) first;
    /// pushing past the bound is a logic error and panics in debug builds.
    pub fn push(&mut self, waiter: Waiter<W>) {
        debug_assert!(self.entries.len() < self.max, "wait queue overfilled");
        self.entries.push_back(waiter);
    }

    /// Pop the oldest waiter.
    pub fn pop_front(&mut self) -> Option<Waiter<W>> {
        self.entries.pop_front()
    }

    /// Remove a specific waiter (its timeout fired). Returns `None` when the
    /// waiter was already served or rejected.
    pub fn remove(&mut self, id: u64) -> Option<Waiter<W>> {
        let pos = self.entries.iter().position(|w| w.id == id)?;
        self.entries.remove(pos)
    }

    /// Take every queued waiter, leaving the queue empty. Used by shutdown
    /// to reject all pending requests in one pass.
    pub fn drain_all(&mut self) -> Vec<Waiter<W>> {
        self.entries.drain(..).collect()
    }
}
