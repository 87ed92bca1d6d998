//! The worker run loop.
//!
//! A worker is one running instance of a pool's step logic. Its loop is:
//! bounded step, self-scale decision, self-retire decision. Cancellation
//! is strictly hierarchical: every iteration derives a fresh child handle
//! from the shared shutdown signal, optionally raced against a local
//! timer, and a local timeout never cancels siblings or the root.

use crate::{
    error::{BoxError, StepError},
    pool::descriptor::PoolDescriptor,
};
use core::{fmt, time::Duration};
use portable_atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One unit of pool execution, supplied by the embedding application.
///
/// `execute` runs one bounded iteration and must cooperate with the given
/// cancellation handle: return [`StepError::Cancelled`] once the handle
/// fires. The two decision hooks are consulted after every completed
/// iteration; both default to "no", which yields a fixed-size pool.
#[async_trait::async_trait]
pub trait Worker: Send {
    /// Runs one bounded iteration.
    async fn execute(&mut self, cancel: CancellationToken) -> Result<(), StepError>;

    /// Whether this worker should ask its pool to start a sibling.
    fn should_spawn_sibling(&self) -> bool {
        false
    }

    /// Whether this worker should try to retire itself. Retirement is
    /// only honored while the pool stays at or above its minimum.
    fn should_retire(&self) -> bool {
        false
    }
}

/// Opaque identity of one running worker, used for logging and
/// correlation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(u64);

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

impl WorkerId {
    pub(crate) fn next() -> Self {
        Self(NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Releases a claimed slot exactly once when the worker's scope unwinds,
/// unless the worker already retired through `release_slot_if_above_min`.
pub(crate) struct SlotGuard {
    descriptor: Arc<PoolDescriptor>,
    armed: bool,
}

impl SlotGuard {
    pub(crate) fn new(descriptor: Arc<PoolDescriptor>) -> Self {
        Self {
            descriptor,
            armed: true,
        }
    }

    /// Marks the slot as already released through self-retirement.
    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if self.armed {
            self.descriptor.force_release_slot();
        }
    }
}

/// How one bounded step ended, after attributing any cancellation to the
/// local timer or the terminal signal.
pub(crate) enum StepOutcome {
    Completed,
    TimedOut,
    Cancelled,
    Failed(BoxError),
}

/// Runs one step under a fresh child handle of `terminal`, racing it
/// against a local timer when `limit` is set.
///
/// When the timer fires first, only the iteration handle is cancelled and
/// the step is awaited until it observes the handle; the terminal signal
/// is never touched. The returned outcome attributes a reported
/// cancellation: terminal signal wins over the local timer, and an
/// unattributed cancellation is treated as terminal.
pub(crate) async fn bounded_step<S, F>(
    terminal: &CancellationToken,
    limit: Option<Duration>,
    step: S,
) -> StepOutcome
where
    S: FnOnce(CancellationToken) -> F,
    F: Future<Output = Result<(), StepError>>,
{
    let iteration = terminal.child_token();
    let fut = step(iteration.clone());
    let result = match limit {
        Some(limit) => {
            tokio::pin!(fut);
            tokio::select! {
                result = &mut fut => result,
                () = tokio::time::sleep(limit) => {
                    iteration.cancel();
                    fut.await
                }
            }
        }
        None => fut.await,
    };

    match result {
        Ok(()) => StepOutcome::Completed,
        Err(StepError::Cancelled) => {
            if terminal.is_cancelled() {
                StepOutcome::Cancelled
            } else if iteration.is_cancelled() {
                StepOutcome::TimedOut
            } else {
                StepOutcome::Cancelled
            }
        }
        Err(StepError::Failed(error)) => StepOutcome::Failed(error),
    }
}

/// Spawns a sibling worker for `descriptor` onto the runtime.
///
/// Kept out of [`run_worker`]'s body so the two futures' `Send` analyses
/// don't form a recursive cycle (`run_worker` awaits `materialize`, which
/// awaits `run_worker`).
fn spawn_sibling(descriptor: Arc<PoolDescriptor>) {
    tokio::spawn(descriptor.materialize());
}

/// Drives one worker to completion: the iteration loop, the self-scale
/// and self-retire decisions, and slot release at exit.
pub(crate) async fn run_worker(
    descriptor: Arc<PoolDescriptor>,
    mut worker: Box<dyn Worker>,
    slot: SlotGuard,
) {
    let worker_id = WorkerId::next();
    // Captured once: a later unlink must not invalidate a running
    // worker's handle. An unlinked pool runs against a signal that never
    // fires.
    let root = descriptor.root_token().unwrap_or_default();
    let observer = Arc::clone(descriptor.observer());
    let mut slot = slot;

    observer.worker_started(descriptor.pool_id(), worker_id);
    #[cfg(feature = "tracing")]
    tracing::trace!(pool = %descriptor.pool_id(), worker = %worker_id, "worker started");

    let mut retired = false;
    loop {
        if root.is_cancelled() || !descriptor.is_enabled() {
            break;
        }

        observer.execution_starting(descriptor.pool_id(), worker_id);
        let outcome = bounded_step(&root, descriptor.execution_timeout(), |cancel| {
            worker.execute(cancel)
        })
        .await;
        match outcome {
            StepOutcome::Completed => {
                observer.execution_finished(descriptor.pool_id(), worker_id);
            }
            StepOutcome::TimedOut => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    pool = %descriptor.pool_id(),
                    worker = %worker_id,
                    timeout = ?descriptor.execution_timeout(),
                    "iteration cancelled after exceeding its execution timeout"
                );
                observer.execution_timed_out(descriptor.pool_id(), worker_id);
            }
            StepOutcome::Cancelled => {
                observer.execution_cancelled(descriptor.pool_id(), worker_id);
                break;
            }
            StepOutcome::Failed(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    pool = %descriptor.pool_id(),
                    worker = %worker_id,
                    error = %error,
                    "iteration failed"
                );
                observer.execution_failed(descriptor.pool_id(), worker_id, &error);
            }
        }

        if root.is_cancelled() || !descriptor.is_enabled() {
            break;
        }

        if descriptor.approve_new_worker() && worker.should_spawn_sibling() {
            observer.sibling_requested(descriptor.pool_id(), worker_id);
            spawn_sibling(Arc::clone(&descriptor));
        }

        if worker.should_retire() && descriptor.release_slot_if_above_min() {
            retired = true;
            break;
        }
        // A declined retirement leaves the slot claimed; the loop
        // continues because this worker is needed for the minimum.
    }

    if retired {
        slot.disarm();
    }
    drop(slot);

    observer.worker_stopped(descriptor.pool_id(), worker_id);
    #[cfg(feature = "tracing")]
    tracing::trace!(pool = %descriptor.pool_id(), worker = %worker_id, "worker exited");
}
