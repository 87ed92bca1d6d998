//! The top-level execution context.
//!
//! An [`ExecutionContext`] owns the registry of pool descriptors, the
//! shared shutdown signal, the global creation gate, and the graceful
//! drain. It registers its daemon at construction; [`start`] launches it.
//!
//! Shutdown is a poll-based drain rather than a wait on each worker:
//! workers are not directly addressable by the context, so [`finalize`]
//! cancels the shared signal and then periodically sums the running
//! counts until every pool reaches zero.
//!
//! [`start`]: ExecutionContext::start
//! [`finalize`]: ExecutionContext::finalize

use crate::{
    error::{Error, Result},
    pool::{DAEMON_POOL_ID, DaemonWorker, GateFn, PoolConfig, PoolDescriptor, PoolId, Worker},
};
use core::time::Duration;
use parking_lot::{Mutex, RwLock};
use std::{collections::HashMap, sync::Arc};
use tokio_util::sync::CancellationToken;

/// Timing configuration for one execution context.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Cadence of the daemon's reconciliation scan.
    pub monitor_interval: Duration,
    /// Cadence of the drain poll during [`ExecutionContext::finalize`].
    pub exit_interval: Duration,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            monitor_interval: Duration::from_secs(15),
            exit_interval: Duration::from_secs(5),
        }
    }
}

pub(crate) struct ContextInner {
    registry: Mutex<Registry>,
    root: CancellationToken,
    gate: RwLock<GateFn>,
    config: ContextConfig,
}

struct Registry {
    pools: HashMap<PoolId, Arc<PoolDescriptor>>,
    finalizing: bool,
}

impl ContextInner {
    /// Snapshot of every enabled pool except the daemon, for the scan.
    pub(crate) fn enabled_pools(&self) -> Vec<Arc<PoolDescriptor>> {
        self.registry
            .lock()
            .pools
            .values()
            .filter(|descriptor| {
                descriptor.pool_id() != DAEMON_POOL_ID && descriptor.is_enabled()
            })
            .cloned()
            .collect()
    }

    fn approve(&self) -> bool {
        let gate = Arc::clone(&*self.gate.read());
        gate()
    }
}

/// The registry of pools plus the shared shutdown signal and global
/// creation gate. Cheap to clone; clones share one context.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl ExecutionContext {
    /// Creates a context and registers its daemon. The daemon does not
    /// run until [`start`] is called.
    ///
    /// [`start`]: ExecutionContext::start
    pub fn new(config: ContextConfig) -> Self {
        let inner = Arc::new(ContextInner {
            registry: Mutex::new(Registry {
                pools: HashMap::new(),
                finalizing: false,
            }),
            root: CancellationToken::new(),
            gate: RwLock::new(Arc::new(|| true) as GateFn),
            config: config.clone(),
        });
        let context = Self { inner };

        let weak = Arc::downgrade(&context.inner);
        let interval = config.monitor_interval;
        let daemon = PoolDescriptor::new(
            PoolConfig::new(DAEMON_POOL_ID, "daemon").with_limits(1, Some(1)),
            move || Ok(Box::new(DaemonWorker::new(weak.clone(), interval)) as Box<dyn Worker>),
        );
        context
            .link_and_insert(daemon)
            .expect("fresh registry accepts the daemon");
        context
    }

    /// Launches the daemon. Calling this more than once is harmless: the
    /// daemon pool is capped at one worker.
    pub fn start(&self) {
        if let Some(daemon) = self.pool(DAEMON_POOL_ID) {
            tokio::spawn(daemon.materialize());
        }
    }

    /// Registers a pool descriptor.
    ///
    /// # Errors
    ///
    /// - [`Error::ReservedPoolId`] for the daemon's id.
    /// - [`Error::Finalizing`] once shutdown has begun.
    /// - [`Error::AlreadyRegistered`] for a duplicate id.
    /// - [`Error::AlreadyLinked`] if the descriptor is bound to a context.
    ///
    /// No state changes on any rejection.
    pub fn register(&self, descriptor: Arc<PoolDescriptor>) -> Result<()> {
        if descriptor.pool_id() == DAEMON_POOL_ID {
            return Err(Error::ReservedPoolId(DAEMON_POOL_ID));
        }
        self.link_and_insert(descriptor)
    }

    fn link_and_insert(&self, descriptor: Arc<PoolDescriptor>) -> Result<()> {
        let mut registry = self.inner.registry.lock();
        if registry.finalizing {
            return Err(Error::Finalizing);
        }
        if registry.pools.contains_key(&descriptor.pool_id()) {
            return Err(Error::AlreadyRegistered(descriptor.pool_id()));
        }

        // The gate indirects through the context so a later
        // `set_global_gate` applies to every registered pool. A context
        // that has been dropped stops gating.
        let weak = Arc::downgrade(&self.inner);
        let gate: GateFn = Arc::new(move || weak.upgrade().is_none_or(|inner| inner.approve()));
        descriptor.link(self.inner.root.clone(), gate)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(pool = %descriptor.pool_id(), name = %descriptor.name(), "pool registered");
        registry.pools.insert(descriptor.pool_id(), descriptor);
        Ok(())
    }

    /// Removes and unlinks a pool descriptor.
    ///
    /// Running workers are not stopped: they keep their cloned shutdown
    /// handles and run as an unmanaged, un-gated pool until they
    /// naturally exit.
    ///
    /// # Errors
    ///
    /// - [`Error::ReservedPoolId`] for the daemon's id.
    /// - [`Error::UnknownPool`] if no such pool is registered.
    pub fn unregister(&self, pool_id: PoolId) -> Result<()> {
        if pool_id == DAEMON_POOL_ID {
            return Err(Error::ReservedPoolId(pool_id));
        }
        let removed = self.inner.registry.lock().pools.remove(&pool_id);
        match removed {
            Some(descriptor) => {
                descriptor.unlink();
                #[cfg(feature = "tracing")]
                tracing::debug!(pool = %pool_id, "pool unregistered");
                Ok(())
            }
            None => Err(Error::UnknownPool(pool_id)),
        }
    }

    /// Replaces the global creation-approval predicate. Takes effect for
    /// every registered pool on its next evaluation.
    pub fn set_global_gate(&self, gate: impl Fn() -> bool + Send + Sync + 'static) {
        *self.inner.gate.write() = Arc::new(gate);
    }

    /// Looks up a registered descriptor.
    pub fn pool(&self, pool_id: PoolId) -> Option<Arc<PoolDescriptor>> {
        self.inner.registry.lock().pools.get(&pool_id).cloned()
    }

    /// Sum of running workers across every registered pool, the daemon
    /// included.
    pub fn running_total(&self) -> i64 {
        self.inner
            .registry
            .lock()
            .pools
            .values()
            .map(|descriptor| descriptor.running_count())
            .sum()
    }

    /// The shared shutdown signal. Cancelling it is equivalent to the
    /// signaling phase of [`finalize`].
    ///
    /// [`finalize`]: ExecutionContext::finalize
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.root.clone()
    }

    /// Gracefully drains the runtime: signals shutdown, then polls the
    /// summed running counts every `exit_interval` until they reach zero
    /// or `caller` fires, and finally unlinks every descriptor.
    ///
    /// Registration is rejected from the moment this is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] when `caller` fired before the drain
    /// completed; descriptors are unlinked regardless.
    pub async fn finalize(&self, caller: CancellationToken) -> Result<()> {
        self.inner.root.cancel();
        self.inner.registry.lock().finalizing = true;

        loop {
            let remaining = self.running_total();
            if remaining <= 0 {
                #[cfg(feature = "tracing")]
                tracing::info!("all workers exited gracefully");
                break;
            }
            if caller.is_cancelled() {
                #[cfg(feature = "tracing")]
                tracing::warn!(remaining, "drain abandoned by caller");
                self.unlink_all();
                return Err(Error::Cancelled);
            }
            #[cfg(feature = "tracing")]
            tracing::info!(remaining, "waiting for workers to exit");
            tokio::select! {
                () = caller.cancelled() => {}
                () = tokio::time::sleep(self.inner.config.exit_interval) => {}
            }
        }

        self.unlink_all();
        Ok(())
    }

    fn unlink_all(&self) {
        for descriptor in self.inner.registry.lock().pools.values() {
            descriptor.unlink();
        }
    }
}

impl core::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let registry = self.inner.registry.lock();
        f.debug_struct("ExecutionContext")
            .field("pools", &registry.pools.len())
            .field("finalizing", &registry.finalizing)
            .finish_non_exhaustive()
    }
}
