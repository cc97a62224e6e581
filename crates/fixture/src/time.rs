//! The shared time fixture
//!
//! Every test case of a run reads through one time object. It is built on
//! first use from the process's case settings and kept for the rest of the
//! run; test cases only redirect its case paths (see [`prepare_case`]).

use crate::error::{FixtureError, Result};
use crate::time_paths::modify_time_paths;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, MutexGuard};
use serpar_core::{ProcessTopology, ResourcePathOverride};
use serpar_foam::{Time, TimeConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

static CASE_SETTINGS: OnceCell<TimeSettings> = OnceCell::new();

/// Where the shared time fixture finds its case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSettings {
    /// Directory containing the case; empty means the working directory
    pub root_path: PathBuf,
    /// Case directory name below `root_path`; empty means `root_path` itself
    pub case_name: PathBuf,
}

impl TimeSettings {
    /// Settings for `root_path/case_name`
    pub fn new(root_path: impl Into<PathBuf>, case_name: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            case_name: case_name.into(),
        }
    }

    /// Settings configured for this process, or the working directory.
    pub fn current() -> TimeSettings {
        CASE_SETTINGS.get().cloned().unwrap_or_default()
    }
}

/// Configure the case of this process's shared time fixture.
///
/// # Errors
///
/// Returns [`FixtureError::SettingsAlreadySet`] on a second call.
pub fn set_case_settings(settings: TimeSettings) -> Result<()> {
    CASE_SETTINGS
        .set(settings)
        .map_err(|_| FixtureError::SettingsAlreadySet)
}

/// Build a time object for `settings`, without function objects.
///
/// # Errors
///
/// Fails if the case's `system/controlDict` cannot be read.
pub fn create_test_time(settings: &TimeSettings) -> Result<Time> {
    let mut config = TimeConfig::new(&settings.root_path, &settings.case_name);
    config.function_objects = false;
    Ok(Time::new(config)?)
}

/// Redirect `time` to this process's share of its case.
///
/// In a parallel run the case name becomes `<base>/processor<rank>` and the
/// time is flagged as a processor case; in a serial run nothing changes.
/// The base is always taken from the undecomposed case, so preparing the
/// same time twice gives the same paths.
pub fn prepare_case(time: &mut Time, topology: &ProcessTopology) -> ResourcePathOverride {
    let path_override = topology.resource_override(time.global_case_name());
    if topology.is_parallel() {
        modify_time_paths(time, &path_override);
    }
    path_override
}

struct SharedTimeState {
    base_case: PathBuf,
    time: Mutex<Time>,
}

/// Lazily constructed, process-global time fixture.
///
/// ```ignore
/// static TIME: SharedTime = SharedTime::new();
///
/// let mut time = TIME.get_or_init()?;
/// ```
pub struct SharedTime {
    state: OnceCell<SharedTimeState>,
}

impl SharedTime {
    /// An empty fixture; the time object is built on first access.
    pub const fn new() -> Self {
        Self {
            state: OnceCell::new(),
        }
    }

    /// Lock the time object, building it from [`TimeSettings::current`] on
    /// first access.
    ///
    /// # Errors
    ///
    /// Fails if the time object has to be built and cannot be.
    pub fn get_or_init(&self) -> Result<MutexGuard<'_, Time>> {
        self.get_or_init_with(&TimeSettings::current())
    }

    /// Lock the time object, building it from `settings` on first access.
    /// Later calls ignore `settings`.
    ///
    /// # Errors
    ///
    /// Fails if the time object has to be built and cannot be. A failed
    /// build leaves the fixture empty, so the next call tries again.
    pub fn get_or_init_with(&self, settings: &TimeSettings) -> Result<MutexGuard<'_, Time>> {
        let state = self.state.get_or_try_init(|| {
            let time = create_test_time(settings)?;
            info!(
                target: "serpar::fixture",
                case = %time.path().display(),
                "Shared time fixture created"
            );
            Ok::<_, FixtureError>(SharedTimeState {
                base_case: time.case_name().to_path_buf(),
                time: Mutex::new(time),
            })
        })?;
        Ok(state.time.lock())
    }

    /// Case name the time object was built with, once it is built.
    pub fn base_case(&self) -> Option<&Path> {
        self.state.get().map(|state| state.base_case.as_path())
    }

    /// Whether the time object has been built
    pub fn is_initialized(&self) -> bool {
        self.state.get().is_some()
    }

    /// Lock the time object and prepare it for `topology`.
    ///
    /// # Errors
    ///
    /// Fails if the time object has to be built and cannot be.
    pub fn prepare(&self, topology: &ProcessTopology) -> Result<MutexGuard<'_, Time>> {
        let mut time = self.get_or_init()?;
        let path_override = prepare_case(&mut time, topology);
        debug!(
            target: "serpar::fixture",
            rank = topology.rank(),
            case = %path_override.case_name().display(),
            "Case prepared"
        );
        Ok(time)
    }
}

impl Default for SharedTime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SharedTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedTime")
            .field("base_case", &self.base_case())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serpar_foam::{set_fatal_policy, FatalErrorPolicy};
    use std::fs;
    use tempfile::TempDir;

    fn case_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("cavity/system")).unwrap();
        fs::write(dir.path().join("cavity/system/controlDict"), "endTime = 0.5\n").unwrap();
        dir
    }

    #[test]
    fn test_create_test_time() {
        let dir = case_dir();
        let time = create_test_time(&TimeSettings::new(dir.path(), "cavity")).unwrap();
        assert!(!time.function_objects());
        assert!(!time.processor_case());
        assert_eq!(time.path(), dir.path().join("cavity"));
    }

    #[test]
    fn test_missing_control_dict_is_error() {
        set_fatal_policy(FatalErrorPolicy::Raise);
        let dir = TempDir::new().unwrap();
        let err = create_test_time(&TimeSettings::new(dir.path(), "missing")).unwrap_err();
        assert!(matches!(err, FixtureError::Foam(_)));
    }

    #[test]
    fn test_prepare_case_is_idempotent() {
        let dir = case_dir();
        let mut time = create_test_time(&TimeSettings::new(dir.path(), "cavity")).unwrap();
        let topology = ProcessTopology::new(1, 2).unwrap();

        let first = prepare_case(&mut time, &topology);
        let path_after_first = time.path();
        let second = prepare_case(&mut time, &topology);

        assert_eq!(first, second);
        assert_eq!(time.path(), path_after_first);
        assert_eq!(time.path(), dir.path().join("cavity/processor1"));
    }

    #[test]
    fn test_prepare_case_serial_leaves_time_alone() {
        let dir = case_dir();
        let mut time = create_test_time(&TimeSettings::new(dir.path(), "cavity")).unwrap();
        let path_override = prepare_case(&mut time, &ProcessTopology::SERIAL);
        assert!(path_override.is_identity());
        assert_eq!(time.path(), dir.path().join("cavity"));
    }

    #[test]
    fn test_shared_time_builds_once() {
        let dir = case_dir();
        let shared = SharedTime::new();
        assert!(!shared.is_initialized());
        assert_eq!(shared.base_case(), None);

        let settings = TimeSettings::new(dir.path(), "cavity");
        shared.get_or_init_with(&settings).unwrap().increment();

        // Second access ignores the (bogus) settings and sees the same object
        let again = shared
            .get_or_init_with(&TimeSettings::new("/nonexistent", "none"))
            .unwrap();
        assert_eq!(again.time_index(), 1);
        drop(again);
        assert_eq!(shared.base_case(), Some(Path::new("cavity")));
    }

    #[test]
    fn test_shared_time_retries_failed_build() {
        set_fatal_policy(FatalErrorPolicy::Raise);
        let dir = case_dir();
        let shared = SharedTime::new();
        assert!(shared
            .get_or_init_with(&TimeSettings::new(dir.path(), "missing"))
            .is_err());
        assert!(!shared.is_initialized());
        assert!(shared
            .get_or_init_with(&TimeSettings::new(dir.path(), "cavity"))
            .is_ok());
    }
}
