//! Minimal finite-volume framework used by the serpar harness
//!
//! A small, file-backed stand-in for the numerical framework the harness
//! tests against:
//! - Time: case paths and run control, read from `system/controlDict`
//! - Mesh: per-case (or per-processor) cell counts and patches
//! - VolScalarField: uniform cell fields with typed boundary patches
//! - Global reductions over a [`serpar_comm::Communicator`]
//!
//! Unrecoverable errors follow the process-wide fatal-error policy, see
//! [`error`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dimensions;
pub mod error;
pub mod field;
pub mod mesh;
pub mod reduce;
pub mod time;

pub use dimensions::{
    DimensionSet, DimensionedScalar, DIM_KINEMATIC_PRESSURE, DIM_LENGTH, DIM_LESS, DIM_TIME,
    DIM_VOLUME,
};
pub use error::{
    fatal, fatal_policy, set_fatal_policy, set_warning_level, warning_level, FatalErrorPolicy,
    FoamError, Result,
};
pub use field::{PatchField, PatchType, VolScalarField};
pub use mesh::{IoObject, Mesh, ReadOption, WriteOption, DEFAULT_REGION};
pub use reduce::{g_max, g_min, return_reduce_sum};
pub use time::{ControlDict, Time, TimeConfig};
