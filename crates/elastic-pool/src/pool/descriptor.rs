//! Per-pool descriptor: slot accounting, activation, and context linkage.
//!
//! A [`PoolDescriptor`] owns everything one pool of same-typed workers
//! shares: the running counter with its min/max bounds, the activation
//! factory that builds a new worker, the enabled flag, and the
//! back-reference to the owning execution context (shutdown signal and
//! global creation gate). The descriptor is the sole admission-control
//! gate for workers of its type.
//!
//! Slot accounting combines an atomic counter with a slot lock: the
//! counter makes reads cheap from any thread, while the lock serializes
//! the compound claim-under-max and release-above-min sequences so the
//! bounds check and the commit cannot interleave between siblings.

use crate::{
    error::{BoxError, Error, Result},
    observer::{NoopObserver, PoolObserver},
    pool::worker::{SlotGuard, Worker, run_worker},
};
use core::{fmt, time::Duration};
use parking_lot::{Mutex, RwLock};
use portable_atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Identifies one pool within an execution context.
///
/// Ids are chosen by the embedding application and must be unique per
/// context. One id is reserved for the built-in daemon
/// ([`DAEMON_POOL_ID`]).
///
/// [`DAEMON_POOL_ID`]: crate::DAEMON_POOL_ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub i32);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds one new worker bound to its descriptor.
///
/// The factory is fallible: a construction failure releases the claimed
/// slot and is reported through the observer, without tearing down the
/// pool.
pub type WorkerFactory = Box<dyn Fn() -> core::result::Result<Box<dyn Worker>, BoxError> + Send + Sync>;

/// The predicate an execution context installs to gate new worker
/// creation across every pool it owns.
pub(crate) type GateFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Back-reference from a descriptor to its owning context, installed at
/// registration and cleared at unregistration.
pub(crate) struct ContextLink {
    pub(crate) cancellation: CancellationToken,
    pub(crate) gate: GateFn,
}

/// Static configuration for one pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Unique key within the owning context.
    pub pool_id: PoolId,
    /// Display name used in logs.
    pub name: String,
    /// Lower bound the daemon restores the pool to. Zero marks the pool
    /// suspendable: it may legitimately idle down to no workers.
    pub min_count: usize,
    /// Upper bound on concurrently running workers; `None` is unbounded.
    pub max_count: Option<usize>,
    /// Per-iteration cap layered on the shared shutdown signal.
    pub execution_timeout: Option<Duration>,
    /// Whether a suspended pool (min zero, currently empty) should be
    /// restarted with exactly one worker by the daemon.
    pub reactivate: bool,
    /// Initial enabled state.
    pub enabled: bool,
}

impl PoolConfig {
    pub fn new(pool_id: PoolId, name: impl Into<String>) -> Self {
        Self {
            pool_id,
            name: name.into(),
            min_count: 0,
            max_count: None,
            execution_timeout: None,
            reactivate: true,
            enabled: true,
        }
    }

    /// Sets the min/max worker counts.
    pub fn with_limits(mut self, min_count: usize, max_count: Option<usize>) -> Self {
        self.min_count = min_count;
        self.max_count = max_count;
        self
    }

    /// Sets the per-iteration execution timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = Some(timeout);
        self
    }

    /// Controls daemon reactivation of a suspended pool.
    pub fn with_reactivate(mut self, reactivate: bool) -> Self {
        self.reactivate = reactivate;
        self
    }
}

/// Owns the slot accounting and activation path for one pool of workers.
///
/// A descriptor is created by the embedding application, registered into
/// exactly one [`ExecutionContext`], mutated continuously by its own
/// workers and by the daemon, and unlinked when removed or when the
/// context finalizes.
///
/// [`ExecutionContext`]: crate::ExecutionContext
pub struct PoolDescriptor {
    pool_id: PoolId,
    name: String,
    min_count: usize,
    max_count: Option<usize>,
    execution_timeout: Option<Duration>,
    reactivate: bool,
    enabled: AtomicBool,
    running: AtomicI64,
    slot_lock: Mutex<()>,
    link: RwLock<Option<ContextLink>>,
    factory: WorkerFactory,
    observer: Arc<dyn PoolObserver>,
}

impl PoolDescriptor {
    /// Creates a descriptor with the default (no-op) observer.
    pub fn new(
        config: PoolConfig,
        factory: impl Fn() -> core::result::Result<Box<dyn Worker>, BoxError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Self::with_observer(config, factory, Arc::new(NoopObserver))
    }

    /// Creates a descriptor that reports lifecycle checkpoints to the
    /// given observer.
    pub fn with_observer(
        config: PoolConfig,
        factory: impl Fn() -> core::result::Result<Box<dyn Worker>, BoxError> + Send + Sync + 'static,
        observer: Arc<dyn PoolObserver>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pool_id: config.pool_id,
            name: config.name,
            min_count: config.min_count,
            max_count: config.max_count,
            execution_timeout: config.execution_timeout,
            reactivate: config.reactivate,
            enabled: AtomicBool::new(config.enabled),
            running: AtomicI64::new(0),
            slot_lock: Mutex::new(()),
            link: RwLock::new(None),
            factory: Box::new(factory),
            observer,
        })
    }

    pub fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_count(&self) -> usize {
        self.min_count
    }

    pub fn max_count(&self) -> Option<usize> {
        self.max_count
    }

    pub fn execution_timeout(&self) -> Option<Duration> {
        self.execution_timeout
    }

    pub fn reactivate(&self) -> bool {
        self.reactivate
    }

    /// Number of workers currently holding a slot.
    pub fn running_count(&self) -> i64 {
        self.running.load(Ordering::Relaxed)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Enables or disables the pool. Disabled pools decline to continue
    /// running workers and to admit new ones.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn observer(&self) -> &Arc<dyn PoolObserver> {
        &self.observer
    }

    /// Binds this descriptor to a context's shutdown signal and creation
    /// gate. Fails if the descriptor is already bound.
    pub(crate) fn link(&self, cancellation: CancellationToken, gate: GateFn) -> Result<()> {
        let mut link = self.link.write();
        if link.is_some() {
            return Err(Error::AlreadyLinked(self.pool_id));
        }
        *link = Some(ContextLink { cancellation, gate });
        Ok(())
    }

    /// Clears the context back-reference. Workers already running keep
    /// their cloned cancellation handles; from here on the pool behaves as
    /// unmanaged and un-gated until they naturally exit.
    pub(crate) fn unlink(&self) {
        *self.link.write() = None;
    }

    pub(crate) fn root_token(&self) -> Option<CancellationToken> {
        self.link.read().as_ref().map(|link| link.cancellation.clone())
    }

    /// Consults the context-wide creation gate. An unlinked descriptor
    /// approves unconditionally.
    pub(crate) fn approve_new_worker(&self) -> bool {
        match self.link.read().as_ref() {
            Some(link) => (link.gate)(),
            None => true,
        }
    }

    /// Claims one slot if the pool is below its maximum.
    ///
    /// This is the sole admission-control gate for new workers of this
    /// type. The bounds check and the commit run under the slot lock, so
    /// the running count never observably exceeds `max_count`.
    pub fn try_claim_slot(&self) -> bool {
        let _guard = self.slot_lock.lock();
        let current = self.running.load(Ordering::Relaxed);
        if let Some(max) = self.max_count {
            if current >= max as i64 {
                return false;
            }
        }
        self.running.store(current + 1, Ordering::Relaxed);
        true
    }

    /// Releases one slot if the pool stays at or above its minimum.
    ///
    /// Returns `true` when the caller may terminate. When releasing would
    /// drop the pool below `min_count`, nothing changes and the caller
    /// must keep running.
    pub fn release_slot_if_above_min(&self) -> bool {
        let _guard = self.slot_lock.lock();
        let after = self.running.load(Ordering::Relaxed) - 1;
        if after < self.min_count as i64 {
            return false;
        }
        self.running.store(after, Ordering::Relaxed);
        true
    }

    /// Unconditionally releases one slot. Used when a worker exits
    /// through a non-retirement path (cancellation, disabled pool, fatal
    /// step error path).
    pub fn force_release_slot(&self) {
        let _guard = self.slot_lock.lock();
        let current = self.running.load(Ordering::Relaxed);
        debug_assert!(current > 0, "slot released more often than claimed");
        self.running.store((current - 1).max(0), Ordering::Relaxed);
    }

    /// Claims a slot, builds a worker through the activation factory, and
    /// runs it to completion.
    ///
    /// Never propagates an error to the caller: a rejected claim is a
    /// silent no-op, a factory failure releases the slot and is reported
    /// through the observer, and step failures are absorbed by the run
    /// loop. This makes the method safe to fire and forget from the
    /// daemon's scan or a sibling's scale-up request.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all, fields(pool = %self.pool_id)))]
    pub async fn materialize(self: Arc<Self>) {
        if !self.try_claim_slot() {
            #[cfg(feature = "tracing")]
            tracing::trace!(pool = %self.pool_id, "pool at capacity, claim rejected");
            return;
        }
        let slot = SlotGuard::new(Arc::clone(&self));
        let worker = match (self.factory)() {
            Ok(worker) => worker,
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::error!(pool = %self.pool_id, name = %self.name, error = %error, "activation factory failed");
                self.observer.activation_failed(self.pool_id, &error);
                // The slot guard releases the claim on drop.
                return;
            }
        };
        run_worker(self, worker, slot).await;
    }
}

impl fmt::Debug for PoolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolDescriptor")
            .field("pool_id", &self.pool_id)
            .field("name", &self.name)
            .field("min_count", &self.min_count)
            .field("max_count", &self.max_count)
            .field("running", &self.running_count())
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}
