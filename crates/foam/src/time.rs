//! The time object and the case paths it owns
//!
//! A [`Time`] is constructed from a root path and a case name and reads the
//! case's `system/controlDict`. Every other object (meshes, fields) finds its
//! files through the time object's paths, so the case a `Time` believes it
//! owns decides what gets read.
//!
//! The case name and the processor-case flag are deliberately not settable:
//! a solver decides them once at start-up. `Time` keeps a stable C layout
//! for the fields that describe its paths.

use crate::error::{fatal, FoamError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the run-control dictionary below the system directory.
pub const CONTROL_DICT_NAME: &str = "controlDict";

/// Default system directory name
pub const SYSTEM_DIR: &str = "system";

/// Default constant directory name
pub const CONSTANT_DIR: &str = "constant";

/// Run-control settings read from `system/controlDict` (TOML).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlDict {
    /// Time the run starts at
    #[serde(default)]
    pub start_time: f64,
    /// Time the run ends at
    #[serde(default = "default_end_time")]
    pub end_time: f64,
    /// Time step
    #[serde(default = "default_delta_t", rename = "deltaT")]
    pub delta_t: f64,
}

fn default_end_time() -> f64 {
    1.0
}

fn default_delta_t() -> f64 {
    1.0
}

impl ControlDict {
    /// Read and parse a control dictionary.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed.
    pub fn read(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(fatal(FoamError::FileNotFound(path.to_path_buf())))
            }
            Err(source) => {
                return Err(fatal(FoamError::Io {
                    path: path.to_path_buf(),
                    source,
                }))
            }
        };
        let dict: ControlDict = toml::from_str(&content).map_err(|e| {
            fatal(FoamError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        })?;
        if dict.delta_t <= 0.0 {
            return Err(fatal(FoamError::Parse {
                path: path.to_path_buf(),
                reason: format!("deltaT must be positive, got {}", dict.delta_t),
            }));
        }
        Ok(dict)
    }
}

/// Construction arguments of a [`Time`].
#[derive(Debug, Clone, PartialEq)]
pub struct TimeConfig {
    /// Directory containing the case
    pub root_path: PathBuf,
    /// Case name relative to `root_path`
    pub case_name: PathBuf,
    /// Name of the system directory
    pub system_dir: String,
    /// Name of the constant directory
    pub constant_dir: String,
    /// Whether to load function objects
    pub function_objects: bool,
}

impl TimeConfig {
    /// Configuration for `root_path/case_name` with default directory names
    /// and no function objects.
    pub fn new(root_path: impl Into<PathBuf>, case_name: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            case_name: case_name.into(),
            system_dir: SYSTEM_DIR.to_string(),
            constant_dir: CONSTANT_DIR.to_string(),
            function_objects: false,
        }
    }
}

/// Time and case paths of a run.
#[repr(C)]
#[derive(Debug)]
pub struct Time {
    root_path: PathBuf,
    case_name: PathBuf,
    processor_case: bool,
    system_dir: String,
    constant_dir: String,
    control: ControlDict,
    value: f64,
    time_index: u64,
    function_objects: bool,
}

impl Time {
    /// Construct a time object and read its control dictionary.
    ///
    /// # Errors
    ///
    /// Fatal error if `system/controlDict` is missing or malformed.
    pub fn new(config: TimeConfig) -> Result<Self> {
        let case_path = config.root_path.join(&config.case_name);
        let control_path = case_path.join(&config.system_dir).join(CONTROL_DICT_NAME);
        let control = ControlDict::read(&control_path)?;
        if config.function_objects {
            crate::error::warning("function objects are not supported and will not run");
        }
        debug!(
            target: "serpar::foam",
            case = %case_path.display(),
            start_time = control.start_time,
            "Time created"
        );
        Ok(Self {
            root_path: config.root_path,
            case_name: config.case_name,
            processor_case: false,
            system_dir: config.system_dir,
            constant_dir: config.constant_dir,
            value: control.start_time,
            control,
            time_index: 0,
            function_objects: config.function_objects,
        })
    }

    /// Directory containing the case
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Case name relative to the root path
    pub fn case_name(&self) -> &Path {
        &self.case_name
    }

    /// Whether this time object reads one processor's share of a
    /// decomposed case
    pub fn processor_case(&self) -> bool {
        self.processor_case
    }

    /// `root_path/case_name`
    pub fn path(&self) -> PathBuf {
        self.root_path.join(&self.case_name)
    }

    /// Case name of the undecomposed case
    pub fn global_case_name(&self) -> PathBuf {
        if self.processor_case {
            self.case_name
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        } else {
            self.case_name.clone()
        }
    }

    /// Path of the undecomposed case
    pub fn global_path(&self) -> PathBuf {
        self.root_path.join(self.global_case_name())
    }

    /// System directory; shared by all processors of a decomposed case
    pub fn system_path(&self) -> PathBuf {
        self.global_path().join(&self.system_dir)
    }

    /// Constant directory; per processor in a decomposed case
    pub fn constant_path(&self) -> PathBuf {
        self.path().join(&self.constant_dir)
    }

    /// Name of the constant directory
    pub fn constant(&self) -> &str {
        &self.constant_dir
    }

    /// Current time value
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Number of completed time steps
    pub fn time_index(&self) -> u64 {
        self.time_index
    }

    /// Current time as a directory name, e.g. `"0"` or `"0.005"`
    pub fn time_name(&self) -> String {
        format!("{}", self.value)
    }

    /// Time step
    pub fn delta_t(&self) -> f64 {
        self.control.delta_t
    }

    /// Whether the run has reached its end time
    pub fn end(&self) -> bool {
        self.value >= self.control.end_time
    }

    /// Advance by one time step
    pub fn increment(&mut self) {
        self.value += self.control.delta_t;
        self.time_index += 1;
    }

    /// Whether function objects were requested
    pub fn function_objects(&self) -> bool {
        self.function_objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{set_fatal_policy, FatalErrorPolicy};
    use tempfile::TempDir;

    fn case_with_control(content: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let system = dir.path().join(SYSTEM_DIR);
        fs::create_dir_all(&system).unwrap();
        fs::write(system.join(CONTROL_DICT_NAME), content).unwrap();
        dir
    }

    #[test]
    fn test_reads_control_dict() {
        let dir = case_with_control("startTime = 0\nendTime = 0.5\ndeltaT = 0.005\n");
        let time = Time::new(TimeConfig::new(dir.path(), "")).unwrap();
        assert_eq!(time.time_name(), "0");
        assert_eq!(time.delta_t(), 0.005);
        assert_eq!(time.path(), dir.path().to_path_buf());
        assert!(!time.processor_case());
        assert!(!time.function_objects());
    }

    #[test]
    fn test_defaults_for_missing_entries() {
        let dir = case_with_control("");
        let time = Time::new(TimeConfig::new(dir.path(), "")).unwrap();
        assert_eq!(time.value(), 0.0);
        assert_eq!(time.delta_t(), 1.0);
    }

    #[test]
    fn test_increment_and_end() {
        let dir = case_with_control("endTime = 0.01\ndeltaT = 0.005\n");
        let mut time = Time::new(TimeConfig::new(dir.path(), "")).unwrap();
        assert!(!time.end());
        time.increment();
        time.increment();
        assert_eq!(time.time_index(), 2);
        assert!(time.end());
        assert_eq!(time.time_name(), "0.01");
    }

    #[test]
    fn test_missing_control_dict_raises() {
        set_fatal_policy(FatalErrorPolicy::Raise);
        let dir = TempDir::new().unwrap();
        let err = Time::new(TimeConfig::new(dir.path(), "")).unwrap_err();
        assert!(matches!(err, FoamError::FileNotFound(_)));
    }

    #[test]
    fn test_malformed_control_dict_raises() {
        set_fatal_policy(FatalErrorPolicy::Raise);
        let dir = case_with_control("deltaT = \"fast\"\n");
        let err = Time::new(TimeConfig::new(dir.path(), "")).unwrap_err();
        assert!(matches!(err, FoamError::Parse { .. }));
    }

    #[test]
    fn test_non_positive_delta_t_raises() {
        set_fatal_policy(FatalErrorPolicy::Raise);
        let dir = case_with_control("deltaT = 0\n");
        assert!(Time::new(TimeConfig::new(dir.path(), "")).is_err());
    }

    #[test]
    fn test_paths_of_named_case() {
        let root = TempDir::new().unwrap();
        let system = root.path().join("cavity").join(SYSTEM_DIR);
        fs::create_dir_all(&system).unwrap();
        fs::write(system.join(CONTROL_DICT_NAME), "").unwrap();

        let time = Time::new(TimeConfig::new(root.path(), "cavity")).unwrap();
        assert_eq!(time.case_name(), Path::new("cavity"));
        assert_eq!(time.global_case_name(), PathBuf::from("cavity"));
        assert_eq!(time.system_path(), root.path().join("cavity/system"));
        assert_eq!(time.constant_path(), root.path().join("cavity/constant"));
    }
}
