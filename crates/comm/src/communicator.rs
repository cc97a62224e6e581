//! The collective-operations contract
//!
//! A [`Communicator`] is one process's handle on a process group. Every
//! collective (barrier, all-reduce, finalize) blocks until all members of the
//! group have issued the matching call. Members must issue collectives in the
//! same order; a rank that skips one leaves the others blocked forever. The
//! harness does not detect that, it is an obligation of the test author.

use crate::error::Result;
use serpar_core::ProcessTopology;
use std::fmt;

/// Reduction operator for all-reduce calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    /// Sum of all contributions
    Sum,
    /// Smallest contribution
    Min,
    /// Largest contribution
    Max,
}

impl ReduceOp {
    /// Combine two floating point contributions
    pub fn combine_f64(self, a: f64, b: f64) -> f64 {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Min => a.min(b),
            ReduceOp::Max => a.max(b),
        }
    }

    /// Combine two integer contributions (sums saturate)
    pub fn combine_u64(self, a: u64, b: u64) -> u64 {
        match self {
            ReduceOp::Sum => a.saturating_add(b),
            ReduceOp::Min => a.min(b),
            ReduceOp::Max => a.max(b),
        }
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            ReduceOp::Sum => 0,
            ReduceOp::Min => 1,
            ReduceOp::Max => 2,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ReduceOp::Sum),
            1 => Some(ReduceOp::Min),
            2 => Some(ReduceOp::Max),
            _ => None,
        }
    }
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReduceOp::Sum => "sum",
            ReduceOp::Min => "min",
            ReduceOp::Max => "max",
        };
        f.write_str(name)
    }
}

/// One process's view of a process group.
pub trait Communicator: Send + Sync {
    /// Zero-based rank of this process
    fn rank(&self) -> usize;

    /// Number of processes in the group
    fn size(&self) -> usize;

    /// Block until every member has reached the barrier.
    fn barrier(&self) -> Result<()>;

    /// Element-wise reduction across the group; every member receives the
    /// result in `values`.
    fn all_reduce_f64(&self, values: &mut [f64], op: ReduceOp) -> Result<()>;

    /// Integer variant of [`Communicator::all_reduce_f64`].
    fn all_reduce_u64(&self, values: &mut [u64], op: ReduceOp) -> Result<()>;

    /// Collective shutdown. Later collectives fail.
    fn finalize(&self) -> Result<()>;

    /// Topology of this member
    fn topology(&self) -> ProcessTopology {
        ProcessTopology::new(self.rank(), self.size()).unwrap_or(ProcessTopology::SERIAL)
    }

    /// Whether the group has more than one member
    fn is_parallel(&self) -> bool {
        self.size() > 1
    }

    /// Reduce a single floating point value.
    fn reduce_f64(&self, value: f64, op: ReduceOp) -> Result<f64> {
        let mut buf = [value];
        self.all_reduce_f64(&mut buf, op)?;
        Ok(buf[0])
    }

    /// Reduce a single integer value.
    fn reduce_u64(&self, value: u64, op: ReduceOp) -> Result<u64> {
        let mut buf = [value];
        self.all_reduce_u64(&mut buf, op)?;
        Ok(buf[0])
    }
}

/// The group of one: rank 0, size 1, collectives return immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }

    fn all_reduce_f64(&self, _values: &mut [f64], _op: ReduceOp) -> Result<()> {
        Ok(())
    }

    fn all_reduce_u64(&self, _values: &mut [u64], _op: ReduceOp) -> Result<()> {
        Ok(())
    }

    fn finalize(&self) -> Result<()> {
        Ok(())
    }
}
