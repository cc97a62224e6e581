//! In-memory process group
//!
//! [`LocalGroup`] hands out one [`LocalComm`] per simulated rank. It exists so
//! that collective behavior can be tested inside one process, with one thread
//! standing in for each rank. The harness itself never spawns threads.

use crate::communicator::{Communicator, ReduceOp};
use crate::error::{CommError, Result};
use parking_lot::{Condvar, Mutex};
use serpar_core::ProcessTopology;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Barrier,
    ReduceF64,
    ReduceU64,
    Finalize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Call {
    kind: CallKind,
    op: ReduceOp,
    len: usize,
}

impl Call {
    fn describe(&self) -> String {
        match self.kind {
            CallKind::Barrier => "barrier".to_string(),
            CallKind::ReduceF64 => format!("all_reduce_f64({}, {})", self.op, self.len),
            CallKind::ReduceU64 => format!("all_reduce_u64({}, {})", self.op, self.len),
            CallKind::Finalize => "finalize".to_string(),
        }
    }
}

type Outcome = std::result::Result<Vec<u64>, (usize, String, String)>;

#[derive(Default)]
struct Round {
    generation: u64,
    contributions: Vec<Option<(Call, Vec<u64>)>>,
    arrived: usize,
    outcome: Option<Outcome>,
}

struct Shared {
    size: usize,
    round: Mutex<Round>,
    done: Condvar,
}

/// Factory for an in-memory group of `size` members.
pub struct LocalGroup;

impl LocalGroup {
    /// Create the members of a group, in rank order.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero.
    pub fn create(size: usize) -> Result<Vec<LocalComm>> {
        ProcessTopology::new(0, size)?;
        let shared = Arc::new(Shared {
            size,
            round: Mutex::new(Round {
                contributions: vec![None; size],
                ..Round::default()
            }),
            done: Condvar::new(),
        });
        Ok((0..size)
            .map(|rank| LocalComm {
                rank,
                shared: Arc::clone(&shared),
                finalized: AtomicBool::new(false),
            })
            .collect())
    }
}

/// One member of a [`LocalGroup`].
pub struct LocalComm {
    rank: usize,
    shared: Arc<Shared>,
    finalized: AtomicBool,
}

impl LocalComm {
    fn collective(&self, call: Call, values: Vec<u64>) -> Result<Vec<u64>> {
        if self.finalized.load(Ordering::Acquire) {
            return Err(CommError::Finalized);
        }
        let shared = &self.shared;
        let mut round = shared.round.lock();
        let generation = round.generation;
        round.contributions[self.rank] = Some((call, values));
        round.arrived += 1;

        if round.arrived == shared.size {
            let outcome = combine_in_rank_order(&mut round.contributions);
            round.outcome = Some(outcome);
            round.arrived = 0;
            round.generation += 1;
            shared.done.notify_all();
        } else {
            while round.generation == generation {
                shared.done.wait(&mut round);
            }
        }

        match round.outcome.clone() {
            Some(Ok(values)) => Ok(values),
            Some(Err((rank, expected, found))) => Err(CommError::CollectiveMismatch {
                rank,
                expected,
                found,
            }),
            None => Err(CommError::Protocol("round completed without outcome".to_string())),
        }
    }
}

fn combine_in_rank_order(contributions: &mut [Option<(Call, Vec<u64>)>]) -> Outcome {
    let mut taken = contributions.iter_mut().map(Option::take);
    let Some(Some((first, mut acc))) = taken.next() else {
        return Err((0, "contribution".to_string(), "nothing".to_string()));
    };
    for (i, slot) in taken.enumerate() {
        let rank = i + 1;
        let Some((call, values)) = slot else {
            return Err((rank, first.describe(), "nothing".to_string()));
        };
        if call != first {
            return Err((rank, first.describe(), call.describe()));
        }
        for (a, b) in acc.iter_mut().zip(&values) {
            *a = match first.kind {
                CallKind::ReduceF64 => first
                    .op
                    .combine_f64(f64::from_bits(*a), f64::from_bits(*b))
                    .to_bits(),
                CallKind::ReduceU64 => first.op.combine_u64(*a, *b),
                CallKind::Barrier | CallKind::Finalize => *a,
            };
        }
    }
    Ok(acc)
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self) -> Result<()> {
        let call = Call {
            kind: CallKind::Barrier,
            op: ReduceOp::Sum,
            len: 0,
        };
        self.collective(call, Vec::new()).map(|_| ())
    }

    fn all_reduce_f64(&self, values: &mut [f64], op: ReduceOp) -> Result<()> {
        let call = Call {
            kind: CallKind::ReduceF64,
            op,
            len: values.len(),
        };
        let bits = values.iter().map(|v| v.to_bits()).collect();
        let combined = self.collective(call, bits)?;
        for (slot, b) in values.iter_mut().zip(combined) {
            *slot = f64::from_bits(b);
        }
        Ok(())
    }

    fn all_reduce_u64(&self, values: &mut [u64], op: ReduceOp) -> Result<()> {
        let call = Call {
            kind: CallKind::ReduceU64,
            op,
            len: values.len(),
        };
        let combined = self.collective(call, values.to_vec())?;
        values.copy_from_slice(&combined);
        Ok(())
    }

    fn finalize(&self) -> Result<()> {
        let call = Call {
            kind: CallKind::Finalize,
            op: ReduceOp::Sum,
            len: 0,
        };
        self.collective(call, Vec::new())?;
        self.finalized.store(true, Ordering::Release);
        Ok(())
    }
}

impl std::fmt::Debug for LocalComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalComm")
            .field("rank", &self.rank)
            .field("size", &self.shared.size)
            .finish()
    }
}
