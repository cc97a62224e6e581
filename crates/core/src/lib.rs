//! Core types for the serpar test harness
//!
//! This crate defines the pure building blocks shared by the rest of the
//! workspace:
//! - Error: Error type for topology, tag, and sequence validation
//! - ProcessTopology / ResourcePathOverride: per-rank case paths
//! - MemberAccessor / `steal_member!`: typed access to private fields of
//!   external types
//! - Sequence / SequenceDigest: deterministic generated values
//! - TagSet: the test tag convention

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accessor;
pub mod error;
pub mod sequence;
pub mod tags;
pub mod topology;

pub use accessor::{member_mut, MemberAccessor};
pub use error::{Error, Result};
pub use sequence::{range, range_step, Sequence, SequenceDigest};
pub use tags::{GroupFit, TagSet};
pub use topology::{processor_dir, ProcessTopology, ResourcePathOverride, PROCESSOR_DIR_PREFIX};
