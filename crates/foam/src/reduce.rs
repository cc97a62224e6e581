//! Global reductions over the process group
//!
//! All functions here are collectives: every member of the group must call
//! them in the same order, including members with nothing to contribute.

use crate::error::Result;
use serpar_comm::{Communicator, ReduceOp};

/// Largest of the members' values
pub fn g_max(comm: &dyn Communicator, local: f64) -> Result<f64> {
    Ok(comm.reduce_f64(local, ReduceOp::Max)?)
}

/// Smallest of the members' values
pub fn g_min(comm: &dyn Communicator, local: f64) -> Result<f64> {
    Ok(comm.reduce_f64(local, ReduceOp::Min)?)
}

/// Sum of the members' counts, returned to every member.
pub fn return_reduce_sum(comm: &dyn Communicator, local: u64) -> Result<u64> {
    Ok(comm.reduce_u64(local, ReduceOp::Sum)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serpar_comm::{LocalGroup, SerialComm};
    use std::thread;

    #[test]
    fn test_serial_reductions_are_identity() {
        assert_eq!(g_max(&SerialComm, 3.5).unwrap(), 3.5);
        assert_eq!(g_min(&SerialComm, -1.0).unwrap(), -1.0);
        assert_eq!(return_reduce_sum(&SerialComm, 400).unwrap(), 400);
    }

    #[test]
    fn test_group_reductions() {
        let comms = LocalGroup::create(3).unwrap();
        let results: Vec<(f64, f64, u64)> = thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    s.spawn(move || {
                        let rank = comm.rank() as f64;
                        let out = (
                            g_max(&comm, rank).unwrap(),
                            g_min(&comm, rank).unwrap(),
                            return_reduce_sum(&comm, 100).unwrap(),
                        );
                        comm.finalize().unwrap();
                        out
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for result in results {
            assert_eq!(result, (2.0, 0.0, 300));
        }
    }
}
