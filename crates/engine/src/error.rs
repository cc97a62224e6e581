//! Engine errors
//!
//! Two kinds of error leave this crate:
//! - [`EngineError`]: the session itself could not run (bad test spec,
//!   duplicate registration, report file not writable)
//! - [`AssertionFailed`]: a `require!` failed inside a test body. It travels
//!   through the body as an [`anyhow::Error`] and is recognized by downcast
//!   at the test-case boundary.

use std::panic::Location;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that prevent a session from running
#[derive(Debug, Error)]
pub enum EngineError {
    /// A test name was registered twice
    #[error("Duplicate test case name: {0:?}")]
    DuplicateTest(String),

    /// Malformed tag string on a registered test
    #[error("Invalid tags on test {name:?}: {source}")]
    InvalidTags {
        /// Test name
        name: String,
        /// Tag parser error
        #[source]
        source: serpar_core::Error,
    },

    /// Malformed test spec on the command line
    #[error("Invalid test spec {spec:?}: {reason}")]
    InvalidSpec {
        /// The offending spec
        spec: String,
        /// What is wrong with it
        reason: String,
    },

    /// A generator call site produced values of two different types
    #[error("Generator at {location} changed its value type")]
    GeneratorType {
        /// Call site of the generator
        location: String,
    },

    /// Report could not be written
    #[error("Cannot write report {}: {source}", path.display())]
    Report {
        /// Report path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Report could not be serialized
    #[error("Cannot serialize report: {0}")]
    Json(#[from] serde_json::Error),

    /// Console output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A `require!` that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{macro_name}( {expression} ) failed at {file}:{line}")]
pub struct AssertionFailed {
    /// `REQUIRE` or `REQUIRE_EQ`
    pub macro_name: &'static str,
    /// Source text of the checked expression
    pub expression: String,
    /// Source file of the assertion
    pub file: &'static str,
    /// Source line of the assertion
    pub line: u32,
}

impl AssertionFailed {
    pub(crate) fn new(macro_name: &'static str, expression: &str, at: &Location<'static>) -> Self {
        Self {
            macro_name,
            expression: expression.to_string(),
            file: at.file(),
            line: at.line(),
        }
    }
}
