//! Harness configuration
//!
//! Settings come from three places, later ones winning:
//!
//! 1. built-in defaults
//! 2. the TOML file named by `SERPAR_CONFIG`, if set
//! 3. the individual overrides `SERPAR_CASE_ROOT`, `SERPAR_CASE_NAME` and
//!    `SERPAR_LOG`
//!
//! ```toml
//! case_root = "tests/cases"
//! case_name = "cavity"
//! log_level = "info"
//! warning_level = 0
//! fatal_errors = "raise"
//! connect_timeout_ms = 10000
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use serpar_fixture::TimeSettings;
use serpar_foam::FatalErrorPolicy;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Names the configuration file
pub const ENV_CONFIG: &str = "SERPAR_CONFIG";
/// Overrides [`HarnessConfig::case_root`]
pub const ENV_CASE_ROOT: &str = "SERPAR_CASE_ROOT";
/// Overrides [`HarnessConfig::case_name`]
pub const ENV_CASE_NAME: &str = "SERPAR_CASE_NAME";
/// Overrides [`HarnessConfig::log_level`]
pub const ENV_LOG: &str = "SERPAR_LOG";

/// What a fatal framework error does during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FatalErrors {
    /// Fail the current test case and continue
    #[default]
    Raise,
    /// Exit the process; useful while writing a test
    Abort,
}

impl From<FatalErrors> for FatalErrorPolicy {
    fn from(value: FatalErrors) -> Self {
        match value {
            FatalErrors::Raise => FatalErrorPolicy::Raise,
            FatalErrors::Abort => FatalErrorPolicy::Abort,
        }
    }
}

/// Harness settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Directory containing the case; empty means the working directory
    pub case_root: PathBuf,
    /// Case directory below `case_root`; empty means `case_root` itself
    pub case_name: PathBuf,
    /// Log filter, in `tracing_subscriber::EnvFilter` syntax
    pub log_level: String,
    /// Framework warning level; 0 silences warnings
    pub warning_level: u32,
    /// Fatal framework error handling
    pub fatal_errors: FatalErrors,
    /// How long non-root ranks retry joining the group
    pub connect_timeout_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            case_root: PathBuf::new(),
            case_name: PathBuf::new(),
            log_level: "warn".to_string(),
            warning_level: 0,
            fatal_errors: FatalErrors::Raise,
            connect_timeout_ms: 10_000,
        }
    }
}

impl HarnessConfig {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load, resolving environment variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`HarnessConfig::load`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup(ENV_CONFIG).filter(|p| !p.trim().is_empty()) {
            Some(path) => Self::from_file(Path::new(path.trim()))?,
            None => Self::default(),
        };
        if let Some(root) = lookup(ENV_CASE_ROOT) {
            config.case_root = PathBuf::from(root);
        }
        if let Some(name) = lookup(ENV_CASE_NAME) {
            config.case_name = PathBuf::from(name);
        }
        if let Some(level) = lookup(ENV_LOG) {
            if level.trim().is_empty() {
                return Err(Error::InvalidEnv {
                    var: ENV_LOG,
                    value: level,
                });
            }
            config.log_level = level;
        }
        Ok(config)
    }

    /// Read a configuration file; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Case settings for the shared time fixture
    pub fn time_settings(&self) -> TimeSettings {
        TimeSettings::new(&self.case_root, &self.case_name)
    }

    /// Rendezvous timeout as a duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
