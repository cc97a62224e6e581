//! Process topology and per-rank resource paths
//!
//! A [`ProcessTopology`] is derived once per process from the communication
//! runtime's rank id and group size. From it, every process derives the same
//! kind of [`ResourcePathOverride`]: in a parallel run each rank reads its
//! share of a decomposed case from `processor<rank>` below the case root.
//!
//! Nothing in this module communicates. The override is a pure function of
//! the topology, but every rank must call it, because the path it yields is
//! what the next (collective) mesh load reads from.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix of the per-rank subdirectory of a decomposed case.
pub const PROCESSOR_DIR_PREFIX: &str = "processor";

/// Rank id and group size of the current process.
///
/// Immutable after construction: the communication runtime does not support
/// rank or group changes mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessTopology {
    rank: usize,
    group_size: usize,
}

impl ProcessTopology {
    /// Topology of a single, non-parallel process.
    pub const SERIAL: ProcessTopology = ProcessTopology {
        rank: 0,
        group_size: 1,
    };

    /// Build a topology from a rank id and group size.
    ///
    /// # Errors
    ///
    /// Returns an error if `group_size` is zero or `rank >= group_size`.
    pub fn new(rank: usize, group_size: usize) -> Result<Self> {
        if group_size == 0 {
            return Err(Error::EmptyGroup(group_size));
        }
        if rank >= group_size {
            return Err(Error::RankOutOfRange { rank, group_size });
        }
        Ok(Self { rank, group_size })
    }

    /// Zero-based rank of this process
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of processes in the group
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Whether more than one process participates
    pub fn is_parallel(&self) -> bool {
        self.group_size > 1
    }

    /// Whether this is rank 0
    pub fn is_master(&self) -> bool {
        self.rank == 0
    }

    /// Name of this rank's subdirectory in a decomposed case.
    ///
    /// Deterministic in the rank alone, hence distinct across a group.
    pub fn processor_dir(&self) -> String {
        processor_dir(self.rank)
    }

    /// Derive the case path override for this process.
    ///
    /// Serial runs get the identity override.
    pub fn resource_override(&self, base_case_name: impl Into<PathBuf>) -> ResourcePathOverride {
        let base_case_name = base_case_name.into();
        if self.is_parallel() {
            ResourcePathOverride {
                base_case_name,
                process_subdirectory: Some(self.processor_dir()),
                is_processor_local: true,
            }
        } else {
            ResourcePathOverride::identity(base_case_name)
        }
    }
}

impl Default for ProcessTopology {
    fn default() -> Self {
        Self::SERIAL
    }
}

impl fmt::Display for ProcessTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rank {}/{}", self.rank, self.group_size)
    }
}

/// `processor<rank>`
pub fn processor_dir(rank: usize) -> String {
    format!("{PROCESSOR_DIR_PREFIX}{rank}")
}

/// Case name and processor-locality a fixture should believe it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePathOverride {
    /// Case name the fixture was constructed with
    pub base_case_name: PathBuf,
    /// Per-rank subdirectory, present only in parallel runs
    pub process_subdirectory: Option<String>,
    /// Whether the fixture reads processor-local data
    pub is_processor_local: bool,
}

impl ResourcePathOverride {
    /// Override that leaves the base case untouched.
    pub fn identity(base_case_name: impl Into<PathBuf>) -> Self {
        Self {
            base_case_name: base_case_name.into(),
            process_subdirectory: None,
            is_processor_local: false,
        }
    }

    /// Whether applying this override changes nothing.
    pub fn is_identity(&self) -> bool {
        self.process_subdirectory.is_none() && !self.is_processor_local
    }

    /// The case name to write into the fixture.
    pub fn case_name(&self) -> PathBuf {
        match &self.process_subdirectory {
            Some(sub) => self.base_case_name.join(sub),
            None => self.base_case_name.clone(),
        }
    }

    /// Case directory this override resolves to below `root`.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(self.case_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_serial_topology() {
        let topo = ProcessTopology::new(0, 1).unwrap();
        assert_eq!(topo, ProcessTopology::SERIAL);
        assert!(!topo.is_parallel());
        assert!(topo.is_master());
    }

    #[test]
    fn test_rejects_empty_group() {
        assert_eq!(ProcessTopology::new(0, 0), Err(Error::EmptyGroup(0)));
    }

    #[test]
    fn test_rejects_rank_out_of_range() {
        assert!(matches!(
            ProcessTopology::new(2, 2),
            Err(Error::RankOutOfRange {
                rank: 2,
                group_size: 2
            })
        ));
    }

    #[test]
    fn test_serial_override_is_identity() {
        let ovr = ProcessTopology::SERIAL.resource_override("cavity");
        assert!(ovr.is_identity());
        assert_eq!(ovr.process_subdirectory, None);
        assert!(!ovr.is_processor_local);
        assert_eq!(ovr.case_name(), PathBuf::from("cavity"));
    }

    #[test]
    fn test_parallel_override_uses_processor_dir() {
        let topo = ProcessTopology::new(1, 2).unwrap();
        let ovr = topo.resource_override("");
        assert!(ovr.is_processor_local);
        assert_eq!(ovr.process_subdirectory.as_deref(), Some("processor1"));
        assert_eq!(ovr.case_name(), PathBuf::from("processor1"));
        assert_eq!(
            ovr.resolve(Path::new("/cases/cavity")),
            PathBuf::from("/cases/cavity/processor1")
        );
    }

    #[test]
    fn test_display() {
        let topo = ProcessTopology::new(3, 8).unwrap();
        assert_eq!(topo.to_string(), "rank 3/8");
    }

    proptest! {
        #[test]
        fn prop_processor_dirs_pairwise_distinct(size in 2usize..64) {
            let dirs: HashSet<_> = (0..size)
                .map(|r| ProcessTopology::new(r, size).unwrap().resource_override("case"))
                .map(|o| o.process_subdirectory.unwrap())
                .collect();
            prop_assert_eq!(dirs.len(), size);
        }

        #[test]
        fn prop_subdirectory_depends_on_rank_only(rank in 0usize..32, extra in 1usize..32) {
            let a = ProcessTopology::new(rank, rank + 1 + extra).unwrap();
            let b = ProcessTopology::new(rank, rank + 2).unwrap();
            prop_assert_eq!(
                a.resource_override("x").process_subdirectory,
                b.resource_override("x").process_subdirectory
            );
        }
    }
}
