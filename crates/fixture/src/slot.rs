//! Re-loadable fixture slots
//!
//! Test bodies are re-entered once per section pass, so a fixture that is
//! built inside a body must be rebuilt, not reused, on every pass. A slot
//! holds at most one value and makes the rebuild explicit.

use crate::error::{FixtureError, Result};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use serpar_foam::{IoObject, Mesh, Time};
use tracing::debug;

/// A named, process-global holder for one fixture value.
///
/// ```ignore
/// static MESH: FixtureSlot<Mesh> = FixtureSlot::new("mesh");
/// ```
pub struct FixtureSlot<T> {
    name: &'static str,
    value: Mutex<Option<T>>,
}

impl<T> FixtureSlot<T> {
    /// An empty slot
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            value: parking_lot::const_mutex(None),
        }
    }

    /// Slot name, used in errors and logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Replace the held value with one built by `load`.
    ///
    /// The slot is emptied before `load` runs; if `load` fails the slot
    /// stays empty.
    ///
    /// # Errors
    ///
    /// Returns the error of `load`.
    pub fn reset<E>(&self, load: impl FnOnce() -> std::result::Result<T, E>) -> std::result::Result<(), E> {
        let mut value = self.value.lock();
        *value = None;
        *value = Some(load()?);
        debug!(target: "serpar::fixture", slot = self.name, "Fixture slot reset");
        Ok(())
    }

    /// Empty the slot.
    pub fn clear(&self) {
        if self.value.lock().take().is_some() {
            debug!(target: "serpar::fixture", slot = self.name, "Fixture slot cleared");
        }
    }

    /// Take the held value out, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.value.lock().take()
    }

    /// Whether the slot holds a value
    pub fn is_loaded(&self) -> bool {
        self.value.lock().is_some()
    }

    /// Lock the held value for reading.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::EmptySlot`] if nothing is loaded.
    pub fn get(&self) -> Result<MappedMutexGuard<'_, T>> {
        self.get_mut()
    }

    /// Lock the held value for writing.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::EmptySlot`] if nothing is loaded.
    pub fn get_mut(&self) -> Result<MappedMutexGuard<'_, T>> {
        MutexGuard::try_map(self.value.lock(), Option::as_mut)
            .map_err(|_| FixtureError::EmptySlot(self.name))
    }
}

impl<T> std::fmt::Debug for FixtureSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixtureSlot")
            .field("name", &self.name)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Load mesh `region` of `time`'s current case into `slot`.
///
/// # Errors
///
/// Fails, leaving the slot empty, if the mesh cannot be read.
pub fn reset_mesh(time: &Time, slot: &FixtureSlot<Mesh>, region: &str) -> Result<()> {
    slot.reset(|| {
        let mesh = Mesh::read(&IoObject::mesh(region, time), time)?;
        debug!(
            target: "serpar::fixture",
            region,
            n_cells = mesh.n_cells(),
            case = %mesh.case_path().display(),
            "Mesh loaded"
        );
        Ok::<_, FixtureError>(mesh)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{create_test_time, TimeSettings};
    use serpar_foam::{set_fatal_policy, FatalErrorPolicy, DEFAULT_REGION};
    use std::fs;
    use tempfile::TempDir;

    fn case_dir(n_cells: u64) -> TempDir {
        let dir = TempDir::new().unwrap();
        let case = dir.path().join("cavity");
        fs::create_dir_all(case.join("system")).unwrap();
        fs::create_dir_all(case.join("constant/polyMesh")).unwrap();
        fs::write(case.join("system/controlDict"), "").unwrap();
        fs::write(
            case.join("constant/polyMesh/cells"),
            format!("nCells = {n_cells}\npatches = [\"movingWall\", \"fixedWalls\"]\n"),
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_empty_slot() {
        let slot: FixtureSlot<u32> = FixtureSlot::new("counter");
        assert!(!slot.is_loaded());
        assert!(matches!(slot.get(), Err(FixtureError::EmptySlot("counter"))));
    }

    #[test]
    fn test_reset_replaces_value() {
        let slot = FixtureSlot::new("counter");
        slot.reset(|| Ok::<_, FixtureError>(1)).unwrap();
        slot.reset(|| Ok::<_, FixtureError>(2)).unwrap();
        assert_eq!(*slot.get().unwrap(), 2);
        *slot.get_mut().unwrap() += 1;
        assert_eq!(slot.take(), Some(3));
        assert!(!slot.is_loaded());
    }

    #[test]
    fn test_failed_reset_leaves_slot_empty() {
        let slot = FixtureSlot::new("counter");
        slot.reset(|| Ok::<_, FixtureError>(1)).unwrap();
        let result = slot.reset(|| Err(FixtureError::EmptySlot("source")));
        assert!(result.is_err());
        assert!(!slot.is_loaded());
    }

    #[test]
    fn test_reset_mesh_twice_is_idempotent() {
        let dir = case_dir(400);
        let time = create_test_time(&TimeSettings::new(dir.path(), "cavity")).unwrap();
        let slot = FixtureSlot::new("mesh");

        reset_mesh(&time, &slot, DEFAULT_REGION).unwrap();
        let first = slot.get().unwrap().clone();
        reset_mesh(&time, &slot, DEFAULT_REGION).unwrap();
        let second = slot.get().unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(second.n_cells(), 400);
        assert_eq!(second.patches().len(), 2);
    }

    #[test]
    fn test_reset_mesh_missing_case_empties_slot() {
        set_fatal_policy(FatalErrorPolicy::Raise);
        let dir = case_dir(400);
        let time = create_test_time(&TimeSettings::new(dir.path(), "cavity")).unwrap();
        let slot = FixtureSlot::new("mesh");
        reset_mesh(&time, &slot, DEFAULT_REGION).unwrap();

        let err = reset_mesh(&time, &slot, "solid").unwrap_err();
        assert!(matches!(err, FixtureError::Foam(_)));
        assert!(!slot.is_loaded());
    }

    #[test]
    fn test_clear() {
        let slot = FixtureSlot::new("counter");
        slot.reset(|| Ok::<_, FixtureError>(7)).unwrap();
        slot.clear();
        slot.clear();
        assert!(!slot.is_loaded());
        assert_eq!(format!("{slot:?}"), "FixtureSlot { name: \"counter\", loaded: false }");
    }
}
