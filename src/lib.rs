//! serpar - one test binary, run serially or as a process group
//!
//! serpar runs unit tests of code built on a file-backed numerical
//! framework. The same binary runs either as a single process reading an
//! undecomposed case, or as one member of a group of processes, each
//! reading its own `processor<rank>` share of a decomposed case and
//! combining results through collective reductions.
//!
//! # Quick Start
//!
//! ```ignore
//! use serpar::prelude::*;
//!
//! static TIME: SharedTime = SharedTime::new();
//! static MESH: FixtureSlot<Mesh> = FixtureSlot::new("mesh");
//!
//! fn cell_count(ctx: &mut TestContext) -> anyhow::Result<()> {
//!     let guard = CaseGuard::begin(&TIME, &MESH, topology())?;
//!     let local = guard.mesh()?.n_cells();
//!     let global = return_reduce_sum(&*world(), local)?;
//!     require!(ctx, local <= global);
//!     Ok(())
//! }
//!
//! fn main() -> std::process::ExitCode {
//!     let mut registry = TestRegistry::new();
//!     registry.register("Cell count", "[Serial][Parallel]", cell_count).unwrap();
//!     Driver::run(&registry, std::env::args())
//! }
//! ```
//!
//! # Architecture
//!
//! - `serpar-core`: topology, case path overrides, member accessors,
//!   generated sequences, tags
//! - `serpar-comm`: communicators and the process-wide runtime
//! - `serpar-foam`: the framework stand-in (time, mesh, fields)
//! - `serpar-engine`: registry, sections, generators, assertions, reports
//! - `serpar-fixture`: the per-test-case fixture protocol
//!
//! This crate adds the [`Driver`] that ties them into a test binary.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod driver;
pub mod error;
pub mod logging;

pub use config::{FatalErrors, HarnessConfig};
pub use driver::{Cli, Driver, SessionState};
pub use error::{Error, Result};

pub use serpar_comm as comm;
pub use serpar_engine as engine;
pub use serpar_fixture as fixture;
pub use serpar_foam as foam;

/// Everything a test binary usually needs
pub mod prelude {
    pub use crate::driver::Driver;
    pub use serpar_comm::{is_parallel, topology, world, Communicator};
    pub use serpar_core::{range, range_step, GroupFit, ProcessTopology, Sequence, SequenceDigest};
    pub use serpar_engine::{
        capture, check, check_eq, require, require_eq, TestContext, TestRegistry,
    };
    pub use serpar_fixture::{
        create_field, ensure_group_size, verify_uniform_digest, verify_uniform_sequence, CaseGuard,
        FixtureSlot, SharedTime,
    };
    pub use serpar_foam::{
        g_max, g_min, return_reduce_sum, Mesh, VolScalarField, DIM_LESS, DEFAULT_REGION,
    };
}
