//! Error types for the harness core
//!
//! This module defines the errors raised by the pure building blocks of the
//! harness (topology, tags, sequences). We use `thiserror` for automatic
//! `Display` and `Error` trait implementations.

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the harness core
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A process group must contain at least one process
    #[error("Invalid group size: {0} (must be at least 1)")]
    EmptyGroup(usize),

    /// Rank outside of `[0, group_size)`
    #[error("Rank {rank} out of range for group of size {group_size}")]
    RankOutOfRange {
        /// Offending rank
        rank: usize,
        /// Size of the group
        group_size: usize,
    },

    /// Malformed tag specification
    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    /// Malformed generated-value sequence
    #[error("Invalid sequence: {0}")]
    InvalidSequence(String),
}
