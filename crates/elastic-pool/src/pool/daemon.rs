//! The built-in monitor worker.
//!
//! One daemon runs per execution context (`min = max = 1`, no timeout,
//! never disabled). Its step scans every other registered pool and brings
//! empty ones back to their minimum; it is the only actor that revives a
//! suspended pool.

use crate::{
    context::ContextInner,
    error::StepError,
    pool::{descriptor::PoolId, worker::Worker},
};
use core::time::Duration;
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;

/// The pool id reserved for the built-in daemon. Application registration
/// under this id is rejected.
pub const DAEMON_POOL_ID: PoolId = PoolId(i32::MIN);

pub(crate) struct DaemonWorker {
    context: Weak<ContextInner>,
    interval: Duration,
}

impl DaemonWorker {
    pub(crate) fn new(context: Weak<ContextInner>, interval: Duration) -> Self {
        Self { context, interval }
    }
}

#[async_trait::async_trait]
impl Worker for DaemonWorker {
    async fn execute(&mut self, cancel: CancellationToken) -> Result<(), StepError> {
        let Some(context) = self.context.upgrade() else {
            // The owning context is gone; nothing left to monitor.
            return Err(StepError::Cancelled);
        };

        let pools = context.enabled_pools();
        #[cfg(feature = "tracing")]
        tracing::trace!(pools = pools.len(), "daemon scan");

        for descriptor in pools {
            if cancel.is_cancelled() {
                break;
            }
            let running = descriptor.running_count();
            if running > 0 {
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    pool = %descriptor.pool_id(),
                    name = %descriptor.name(),
                    running,
                    "pool has running workers"
                );
                continue;
            }

            // A suspendable pool is only revived when its policy says so,
            // and then with exactly one worker.
            let target = if descriptor.min_count() == 0 {
                usize::from(descriptor.reactivate())
            } else {
                descriptor.min_count()
            };
            if target == 0 {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    pool = %descriptor.pool_id(),
                    name = %descriptor.name(),
                    "pool remains suspended"
                );
                continue;
            }

            #[cfg(feature = "tracing")]
            tracing::info!(
                pool = %descriptor.pool_id(),
                name = %descriptor.name(),
                target,
                "restoring pool to its minimum"
            );
            for _ in 0..target {
                tokio::spawn(Arc::clone(&descriptor).materialize());
            }
        }
        drop(context);

        // An interruption here is deliberately swallowed: the loop top
        // observes the shared signal and terminates cleanly.
        tokio::select! {
            () = cancel.cancelled() => {}
            () = tokio::time::sleep(self.interval) => {}
        }
        Ok(())
    }

    // The daemon never self-scales and never retires; only its scan acts.
}
