//! Pool descriptors, the worker run loop, and the built-in daemon.

mod daemon;
mod descriptor;
mod worker;

pub use daemon::DAEMON_POOL_ID;
pub(crate) use daemon::DaemonWorker;
pub use descriptor::{PoolConfig, PoolDescriptor, PoolId, WorkerFactory};
pub(crate) use descriptor::GateFn;
pub use worker::{Worker, WorkerId};
pub(crate) use worker::{StepOutcome, bounded_step};
