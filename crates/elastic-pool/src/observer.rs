//! Lifecycle notification surface.
//!
//! The runtime reports worker lifecycle checkpoints through an optional
//! [`PoolObserver`]. Every method has a no-op default, so embedders
//! implement only the hooks they care about. Callbacks are invoked
//! synchronously at the documented checkpoints and must not block.

use crate::{error::BoxError, pool::PoolId, pool::WorkerId};

/// Observer of pool and worker lifecycle events.
///
/// All methods default to no-ops. Implementations are shared across every
/// worker of a pool and may be called concurrently from multiple workers.
#[allow(unused_variables)]
pub trait PoolObserver: Send + Sync {
    /// A worker entered its run loop.
    fn worker_started(&self, pool: PoolId, worker: WorkerId) {}

    /// A worker left its run loop and released its slot.
    fn worker_stopped(&self, pool: PoolId, worker: WorkerId) {}

    /// An iteration step is about to run.
    fn execution_starting(&self, pool: PoolId, worker: WorkerId) {}

    /// An iteration step completed normally.
    fn execution_finished(&self, pool: PoolId, worker: WorkerId) {}

    /// An iteration step was cut short by its per-iteration timeout. The
    /// worker retries on the next loop pass.
    fn execution_timed_out(&self, pool: PoolId, worker: WorkerId) {}

    /// An iteration step observed the shared shutdown signal. The worker
    /// terminates.
    fn execution_cancelled(&self, pool: PoolId, worker: WorkerId) {}

    /// An iteration step failed. The failure is non-fatal; the worker
    /// continues with the next iteration.
    fn execution_failed(&self, pool: PoolId, worker: WorkerId, error: &BoxError) {}

    /// The activation factory failed while constructing a worker. The
    /// claimed slot was released; no worker runs.
    fn activation_failed(&self, pool: PoolId, error: &BoxError) {}

    /// A worker asked its pool to materialize a sibling.
    fn sibling_requested(&self, pool: PoolId, worker: WorkerId) {}
}

/// The default observer: ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PoolObserver for NoopObserver {}
