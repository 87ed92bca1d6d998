#![doc = include_str!("../README.md")]

mod context;
mod error;
mod observer;
mod pool;
mod signal;
mod subscriber;

pub use crate::context::*;
pub use crate::error::*;
pub use crate::observer::*;
pub use crate::pool::{
    DAEMON_POOL_ID, PoolConfig, PoolDescriptor, PoolId, Worker, WorkerFactory, WorkerId,
};
pub use crate::signal::*;
pub use crate::subscriber::*;
