//! Fixture construction for serial and parallel test runs
//!
//! A test binary may run as one process or as a group of processes sharing
//! a decomposed case. The fixtures of a test case are built so that the
//! same test body works in both modes:
//!
//! - time_paths: write access to the case paths of [`serpar_foam::Time`]
//! - time: the process-global time fixture and per-rank case preparation
//! - slot: re-loadable fixture slots and mesh loading
//! - field: uniform volume fields on a loaded mesh
//! - guard: the per-test-case sequence, as one scoped value
//! - group: checks that keep collectives in step across ranks

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod field;
pub mod group;
pub mod guard;
pub mod slot;
pub mod time;
pub mod time_paths;

pub use error::{FixtureError, Result};
pub use field::create_field;
pub use group::{ensure_group_size, verify_uniform_digest, verify_uniform_sequence};
pub use guard::CaseGuard;
pub use slot::{reset_mesh, FixtureSlot};
pub use time::{create_test_time, prepare_case, set_case_settings, SharedTime, TimeSettings};
pub use time_paths::{modify_time_paths, TimeCaseName, TimeProcessorCase};
