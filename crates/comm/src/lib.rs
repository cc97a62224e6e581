//! Process-group communication for the serpar harness
//!
//! This crate provides the collective-operations contract the harness needs
//! from a communication runtime, and three implementations of it:
//! - SerialComm: the group of one, used when no runtime is initialized
//! - TcpComm: processes launched by `serpar-launch`, joined through rank 0
//! - LocalGroup: in-memory members for in-process tests
//!
//! The process-wide lifecycle (init once, finalize once) lives in
//! [`runtime`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod communicator;
pub mod error;
mod frame;
pub mod local;
pub mod runtime;
pub mod tcp;

pub use communicator::{Communicator, ReduceOp, SerialComm};
pub use error::{CommError, Result};
pub use local::{LocalComm, LocalGroup};
pub use runtime::{is_parallel, topology, world, CommContext, CommOptions, LaunchEnv};
pub use tcp::TcpComm;
