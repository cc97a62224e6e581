//! Framework errors and the fatal-error policy
//!
//! Like the numerical frameworks it stands in for, this crate treats
//! unrecoverable states (a missing mesh, an unknown boundary type) as
//! *fatal*. What a fatal error does is a process-wide policy:
//!
//! - [`FatalErrorPolicy::Abort`] (default): log and exit the process
//! - [`FatalErrorPolicy::Raise`]: return the error to the caller
//!
//! A unit-test driver switches to `Raise` so that one failing test case does
//! not take the remaining ones down with it. While writing a test it can be
//! useful to switch back to `Abort` to see the error at the point it occurs.

use serpar_comm::CommError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use thiserror::Error;
use tracing::{error, warn};

/// Result type alias for framework operations
pub type Result<T> = std::result::Result<T, FoamError>;

/// Framework errors
#[derive(Debug, Error)]
pub enum FoamError {
    /// A file that must be read does not exist
    #[error("Cannot find file {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O error while reading a file
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A dictionary could not be parsed
    #[error("Cannot parse {}: {reason}", path.display())]
    Parse {
        /// File being parsed
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Unknown boundary condition type
    #[error("Unknown patch field type {0:?}")]
    UnknownPatchType(String),

    /// Invalid construction arguments
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Collective communication failed
    #[error("Communication error: {0}")]
    Comm(#[from] CommError),
}

/// What a fatal framework error does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalErrorPolicy {
    /// Log the error and exit the process with status 1
    Abort,
    /// Return the error to the caller
    Raise,
}

static FATAL_POLICY: AtomicU8 = AtomicU8::new(0);
static WARNING_LEVEL: AtomicU32 = AtomicU32::new(1);

/// Set the process-wide fatal-error policy.
pub fn set_fatal_policy(policy: FatalErrorPolicy) {
    let code = match policy {
        FatalErrorPolicy::Abort => 0,
        FatalErrorPolicy::Raise => 1,
    };
    FATAL_POLICY.store(code, Ordering::SeqCst);
}

/// Current process-wide fatal-error policy.
pub fn fatal_policy() -> FatalErrorPolicy {
    match FATAL_POLICY.load(Ordering::SeqCst) {
        1 => FatalErrorPolicy::Raise,
        _ => FatalErrorPolicy::Abort,
    }
}

/// Set the warning level; 0 silences framework warnings.
pub fn set_warning_level(level: u32) {
    WARNING_LEVEL.store(level, Ordering::SeqCst);
}

/// Current warning level.
pub fn warning_level() -> u32 {
    WARNING_LEVEL.load(Ordering::SeqCst)
}

/// Route an unrecoverable error through the fatal-error policy.
///
/// Under [`FatalErrorPolicy::Raise`] the error is handed back for the caller
/// to return; under [`FatalErrorPolicy::Abort`] this does not return.
pub fn fatal(err: FoamError) -> FoamError {
    match fatal_policy() {
        FatalErrorPolicy::Raise => err,
        FatalErrorPolicy::Abort => {
            error!(target: "serpar::foam", error = %err, "FATAL ERROR");
            eprintln!("--> FATAL ERROR: {}\n\nFOAM exiting", err);
            std::process::exit(1);
        }
    }
}

/// Emit a framework warning unless the warning level is 0.
pub(crate) fn warning(message: &str) {
    if warning_level() > 0 {
        warn!(target: "serpar::foam", "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_not_found() {
        let err = FoamError::FileNotFound(PathBuf::from("/case/processor1/constant"));
        let msg = err.to_string();
        assert!(msg.contains("Cannot find file"));
        assert!(msg.contains("processor1"));
    }

    #[test]
    fn test_error_display_parse() {
        let err = FoamError::Parse {
            path: PathBuf::from("system/controlDict"),
            reason: "expected a float".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("controlDict"));
        assert!(msg.contains("expected a float"));
    }

    #[test]
    fn test_error_from_comm() {
        let err: FoamError = CommError::Finalized.into();
        assert!(matches!(err, FoamError::Comm(_)));
    }

    // Unit tests in this crate only ever switch the policy to `Raise`; the
    // default is checked in its own integration test binary.
    #[test]
    fn test_raise_returns_error() {
        set_fatal_policy(FatalErrorPolicy::Raise);
        assert_eq!(fatal_policy(), FatalErrorPolicy::Raise);
        let err = fatal(FoamError::UnknownPatchType("bogus".to_string()));
        assert!(matches!(err, FoamError::UnknownPatchType(_)));
    }

    #[test]
    fn test_warning_level() {
        set_warning_level(0);
        assert_eq!(warning_level(), 0);
        warning("not shown");
        set_warning_level(1);
        assert_eq!(warning_level(), 1);
    }
}
