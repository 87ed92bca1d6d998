//! Error types for the elastic pool runtime.
//!
//! This module defines the central [`Error`] enum, which captures all
//! recoverable and reportable error cases within the runtime, and
//! [`StepError`], the outcome type application steps use to distinguish
//! "I observed cancellation" from "the iteration failed".
//!
//! ## Error Cases
//! - `ReservedPoolId`: An application caller used the daemon's pool id.
//! - `AlreadyRegistered` / `UnknownPool`: Registry key conflicts.
//! - `AlreadyLinked`: A descriptor was offered to a second context.
//! - `Finalizing`: A registration arrived after shutdown began.
//! - `Paused` / `NotPaused`: Subscription state-machine violations.
//! - `InvalidCount`: A subscriber scale request was out of range.
//! - `Cancelled`: The caller's own cancellation fired mid-operation.
//! - `QueueClosed`: The subscriber queue is no longer readable.

use crate::pool::PoolId;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// A type-erased error produced by application-supplied factories and steps.
pub type BoxError = Box<dyn core::error::Error + Send + Sync>;

/// Unified error type for the elastic pool runtime.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The pool id is reserved for the built-in daemon.
    #[error("pool id {0} is reserved for the daemon")]
    ReservedPoolId(PoolId),

    /// A pool with this id is already registered in the context.
    #[error("pool {0} is already registered")]
    AlreadyRegistered(PoolId),

    /// No pool with this id is registered in the context.
    #[error("pool {0} is not registered")]
    UnknownPool(PoolId),

    /// The descriptor is already linked to an execution context.
    #[error("pool {0} is already linked to an execution context")]
    AlreadyLinked(PoolId),

    /// The context has begun finalizing; no further registrations.
    #[error("execution context is finalizing")]
    Finalizing,

    /// The subscription is paused (or stopped); the operation is invalid.
    #[error("subscription is paused")]
    Paused,

    /// `resume` was called on a subscription that is still running.
    #[error("subscription is not paused")]
    NotPaused,

    /// A subscriber scale request was zero or exceeded the current target.
    #[error("invalid subscriber count {requested} (current target {target})")]
    InvalidCount { requested: usize, target: usize },

    /// A bounded subscriber queue was requested with zero capacity.
    #[error("queue capacity must be greater than zero")]
    ZeroCapacity,

    /// The caller's cancellation fired before the operation completed.
    #[error("operation cancelled by caller")]
    Cancelled,

    /// The subscriber queue is closed; the payload could not be delivered.
    #[error("subscriber queue closed")]
    QueueClosed,
}

/// Outcome of one application-supplied iteration (or payload) step.
///
/// Steps report cancellation explicitly so the run loop can distinguish a
/// local timeout (retry) from a shutdown signal (terminate). Any other
/// failure is carried as a boxed error and is non-fatal to the worker.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// The step observed its cancellation handle and stopped early.
    #[error("step observed cancellation")]
    Cancelled,

    /// The step failed; the worker logs it and continues with the next
    /// iteration.
    #[error("step failed: {0}")]
    Failed(BoxError),
}

impl StepError {
    /// Wraps an arbitrary error into the non-fatal [`StepError::Failed`]
    /// variant.
    pub fn failed(error: impl Into<BoxError>) -> Self {
        Self::Failed(error.into())
    }
}
