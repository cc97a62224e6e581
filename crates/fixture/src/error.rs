//! Fixture errors

use serpar_comm::CommError;
use serpar_foam::FoamError;
use thiserror::Error;

/// Result type alias for fixture operations
pub type Result<T> = std::result::Result<T, FixtureError>;

/// Errors raised while building or checking fixtures
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The framework failed (missing case files, bad boundary type, ...)
    #[error(transparent)]
    Foam(#[from] FoamError),

    /// A collective failed
    #[error(transparent)]
    Comm(#[from] CommError),

    /// Invalid topology or sequence
    #[error(transparent)]
    Core(#[from] serpar_core::Error),

    /// A fixture slot was read while empty
    #[error("Fixture slot {0:?} is empty")]
    EmptySlot(&'static str),

    /// Case settings were configured twice
    #[error("Case settings already configured")]
    SettingsAlreadySet,

    /// Ranks enumerated different generated sequences
    #[error(
        "Generated sequence differs across ranks: rank {rank} has digest {local:#018x}, \
         group range {min:#018x}..={max:#018x}"
    )]
    SequenceMismatch {
        /// Rank reporting the mismatch
        rank: usize,
        /// This rank's digest
        local: u64,
        /// Smallest digest in the group
        min: u64,
        /// Largest digest in the group
        max: u64,
    },
}
