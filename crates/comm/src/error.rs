//! Error types for the communication runtime

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for communication operations
pub type Result<T> = std::result::Result<T, CommError>;

/// Errors raised by process groups and the runtime lifecycle
#[derive(Debug, Error)]
pub enum CommError {
    /// I/O error on a group link
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid rank or group size
    #[error("Topology error: {0}")]
    Topology(#[from] serpar_core::Error),

    /// A launch environment variable is missing or malformed
    #[error("Invalid launch environment variable {var}: {reason}")]
    LaunchEnv {
        /// Variable name
        var: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Rank 0 did not accept a connection in time
    #[error("Timed out after {waited_ms}ms connecting to rendezvous {addr}")]
    ConnectTimeout {
        /// Rendezvous address
        addr: SocketAddr,
        /// Time spent retrying
        waited_ms: u64,
    },

    /// A peer sent something the protocol does not allow
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Ranks issued structurally different collective calls
    #[error("Collective mismatch from rank {rank}: expected {expected}, got {found}")]
    CollectiveMismatch {
        /// Rank whose call disagreed
        rank: usize,
        /// Call issued by the combining rank
        expected: String,
        /// Call issued by `rank`
        found: String,
    },

    /// `init` called while a runtime is active or after it was finalized
    #[error("Communication runtime already initialized")]
    AlreadyInitialized,

    /// Collective issued after `finalize`
    #[error("Communication runtime already finalized")]
    Finalized,
}
