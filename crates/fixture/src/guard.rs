//! Per-test-case fixture sequencing
//!
//! A test case that reads the mesh runs the same steps every time:
//!
//! 1. redirect the shared time to this rank's case
//! 2. reload the mesh slot from the redirected paths
//! 3. run the body
//! 4. empty the mesh slot
//!
//! [`CaseGuard`] performs 1 and 2 on construction and 4 when it goes out of
//! scope, on every exit path of the body.

use crate::error::Result;
use crate::slot::{reset_mesh, FixtureSlot};
use crate::time::SharedTime;
use parking_lot::{MappedMutexGuard, MutexGuard};
use serpar_core::ProcessTopology;
use serpar_foam::{Mesh, Time, DEFAULT_REGION};
use tracing::debug;

/// Fixtures of one test case pass.
pub struct CaseGuard<'a> {
    time: MutexGuard<'a, Time>,
    slot: &'a FixtureSlot<Mesh>,
    topology: ProcessTopology,
}

impl<'a> CaseGuard<'a> {
    /// Prepare `time` for `topology` and load the default mesh region into
    /// `slot`.
    ///
    /// # Errors
    ///
    /// Fails if the time fixture cannot be built or the mesh cannot be
    /// read. The slot is left empty in either case.
    pub fn begin(
        time: &'a SharedTime,
        slot: &'a FixtureSlot<Mesh>,
        topology: ProcessTopology,
    ) -> Result<Self> {
        Self::begin_region(time, slot, topology, DEFAULT_REGION)
    }

    /// Like [`CaseGuard::begin`], for mesh region `region`.
    ///
    /// # Errors
    ///
    /// Fails if the time fixture cannot be built or the mesh cannot be
    /// read. The slot is left empty in either case.
    pub fn begin_region(
        time: &'a SharedTime,
        slot: &'a FixtureSlot<Mesh>,
        topology: ProcessTopology,
        region: &str,
    ) -> Result<Self> {
        let time = match time.prepare(&topology) {
            Ok(time) => time,
            Err(e) => {
                slot.clear();
                return Err(e);
            }
        };
        reset_mesh(&time, slot, region)?;
        Ok(Self {
            time,
            slot,
            topology,
        })
    }

    /// The prepared time object
    pub fn time(&self) -> &Time {
        &self.time
    }

    /// The loaded mesh.
    ///
    /// The returned guard locks the slot, so it borrows the case guard and
    /// has to be dropped before the case ends:
    ///
    /// ```compile_fail
    /// # use serpar_core::ProcessTopology;
    /// # use serpar_fixture::{CaseGuard, FixtureSlot, SharedTime};
    /// # use serpar_foam::Mesh;
    /// # fn run(time: &SharedTime, slot: &FixtureSlot<Mesh>) -> serpar_fixture::Result<()> {
    /// let guard = CaseGuard::begin(time, slot, ProcessTopology::SERIAL)?;
    /// let mesh = guard.mesh()?;
    /// guard.finish();
    /// println!("{}", mesh.n_cells());
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Fails if the mesh slot was emptied behind the guard's back.
    pub fn mesh(&self) -> Result<MappedMutexGuard<'_, Mesh>> {
        self.slot.get()
    }

    /// Topology the case was prepared for
    pub fn topology(&self) -> &ProcessTopology {
        &self.topology
    }

    /// End the case now, emptying the mesh slot.
    pub fn finish(self) {}
}

impl Drop for CaseGuard<'_> {
    fn drop(&mut self) {
        self.slot.clear();
        debug!(target: "serpar::fixture", rank = self.topology.rank(), "Case finished");
    }
}
