//! Driver errors

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop a run before or after its tests
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration file could not be read
    #[error("Cannot read config {}: {source}", path.display())]
    ConfigRead {
        /// File named by `SERPAR_CONFIG`
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::HarnessConfig`]
    #[error("Cannot parse config {}: {reason}", path.display())]
    ConfigParse {
        /// File named by `SERPAR_CONFIG`
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// An environment override has an unusable value
    #[error("Invalid value {value:?} for {var}")]
    InvalidEnv {
        /// Variable name
        var: &'static str,
        /// Offending value
        value: String,
    },

    /// The communication runtime failed
    #[error(transparent)]
    Comm(#[from] serpar_comm::CommError),

    /// The test engine failed outside of any test body
    #[error(transparent)]
    Engine(#[from] serpar_engine::EngineError),

    /// Fixture setup failed
    #[error(transparent)]
    Fixture(#[from] serpar_fixture::FixtureError),
}
