//! Group-uniformity checks
//!
//! Every rank must issue the same collectives in the same order. That holds
//! only if every rank enumerates the same generated values and takes the
//! same branches; nothing detects a violation, it shows up as a hang. The
//! helpers here let a test check the first condition up front.

use crate::error::{FixtureError, Result};
use serpar_comm::{Communicator, ReduceOp};
use serpar_core::{GroupFit, ProcessTopology, Sequence, SequenceDigest, TagSet};
use std::fmt::Debug;
use tracing::{debug, warn};

/// Check that every rank holds the same generated sequence.
///
/// Collective: every rank must call this at the same point. Returns the
/// sequence digest shared by the group.
///
/// # Errors
///
/// Returns [`FixtureError::SequenceMismatch`] on every rank if any two
/// ranks' digests differ, or the error of the reductions.
pub fn verify_uniform_sequence<T: Debug>(
    comm: &dyn Communicator,
    sequence: &Sequence<T>,
) -> Result<u64> {
    check_uniform(comm, sequence.digest(), sequence.len() as u64)
}

/// Check that every rank recorded the same values into `digest`.
///
/// Use this after the last pass of a test case, with the values each pass
/// actually received from its generators. Collective, like
/// [`verify_uniform_sequence`].
///
/// # Errors
///
/// Returns [`FixtureError::SequenceMismatch`] on every rank if any two
/// ranks' digests differ, or the error of the reductions.
pub fn verify_uniform_digest(comm: &dyn Communicator, digest: &SequenceDigest) -> Result<u64> {
    check_uniform(comm, digest.finish(), digest.count())
}

fn check_uniform(comm: &dyn Communicator, local: u64, count: u64) -> Result<u64> {
    let min = comm.reduce_u64(local, ReduceOp::Min)?;
    let max = comm.reduce_u64(local, ReduceOp::Max)?;
    if min != max {
        warn!(
            target: "serpar::fixture",
            rank = comm.rank(),
            local,
            min,
            max,
            "Generated values differ across ranks"
        );
        return Err(FixtureError::SequenceMismatch {
            rank: comm.rank(),
            local,
            min,
            max,
        });
    }
    debug!(target: "serpar::fixture", digest = local, count, "Generated values uniform");
    Ok(local)
}

/// Whether a test tagged `tags` fits the running group.
///
/// Nothing enforces the answer. A test that skips itself must do so on
/// every rank alike, which holds because every rank sees the same tags and
/// group size.
pub fn ensure_group_size(tags: &TagSet, topology: &ProcessTopology) -> GroupFit {
    let fit = tags.fit(topology.group_size());
    if fit != GroupFit::Run {
        debug!(target: "serpar::fixture", %tags, ?fit, "Test does not fit the group");
    }
    fit
}
