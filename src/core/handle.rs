//! Pooled worker records and the caller-facing lease.

use std::sync::Arc;
use std::time::Instant;

/// Opaque identifier of a pooled worker. Assigned from a monotonically
/// increasing counter at creation; never reused.
pub type WorkerId = u64;

/// Bookkeeping record for one pooled worker process.
///
/// A handle is owned by exactly one of: the pool's idle set, a single caller
/// holding it acquired, or the destroy path that just removed it from the
/// collection. Monotonic [`Instant`]s are used throughout so wall-clock skew
/// cannot corrupt eviction decisions.
#[derive(Debug)]
pub(crate) struct WorkerHandle<W> {
    pub id: WorkerId,
    pub worker: Arc<W>,
    pub created_at: Instant,
    pub last_used_at: Instant,
    /// Non-`None` iff currently acquired.
    pub acquired_at: Option<Instant>,
    /// Redundant with `acquired_at`, kept as an explicit flag for clarity.
    pub is_acquired: bool,
    /// Successful acquisitions served by this worker. Diagnostic only.
    pub use_count: u64,
}

impl<W> WorkerHandle<W> {
    pub fn new(id: WorkerId, worker: Arc<W>) -> Self {
        let now = Instant::now();
        Self {
            id,
            worker,
            created_at: now,
            last_used_at: now,
            acquired_at: None,
            is_acquired: false,
            use_count: 0,
        }
    }

    /// Transition `Idle -> Acquired`.
    pub fn mark_acquired(&mut self, now: Instant) {
        self.is_acquired = true;
        self.acquired_at = Some(now);
        self.last_used_at = now;
        self.use_count += 1;
    }

    /// Transition `Acquired -> Idle` after a healthy release.
    pub fn mark_idle(&mut self, now: Instant) {
        self.is_acquired = false;
        self.acquired_at = None;
        self.last_used_at = now;
    }
}

/// A successfully acquired worker.
///
/// Callers only ever hold the opaque worker resource (behind an [`Arc`]),
/// never the pool's bookkeeping record. Hand the resource back with
/// [`WorkerPool::release`](crate::core::WorkerPool::release) when done.
pub struct Lease<W> {
    id: WorkerId,
    worker: Arc<W>,
}

impl<W> std::fmt::Debug for Lease<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease").field("id", &self.id).finish_non_exhaustive()
    }
}

impl<W> Lease<W> {
    pub(crate) fn new(id: WorkerId, worker: Arc<W>) -> Self {
        Self { id, worker }
    }

    /// Identifier of the pooled worker backing this lease.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// The leased worker resource.
    pub fn worker(&self) -> &Arc<W> {
        &self.worker
    }

    /// Consume the lease, keeping only the worker resource.
    pub fn into_worker(self) -> Arc<W> {
        self.worker
    }
}
