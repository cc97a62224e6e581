//! Test case tags
//!
//! Tests are registered with a bracketed tag string such as
//! `"[Serial][Parallel][Case_cavity][nProcs_2]"`. The harness follows a
//! convention for these tags but does not dispatch on them; only the
//! engine's selection filter reads them. The helpers here let a test author
//! check the convention from inside a test body:
//!
//! - `[Serial]` / `[Parallel]`: execution modes the test supports
//! - `[Case_<name>]`: on-disk case directory the test expects
//! - `[nProcs_<N>]`: group size the test was written for
//!
//! Tag comparison is case-insensitive.

use crate::error::{Error, Result};
use std::fmt;

/// Tag marking a test as runnable on one process.
pub const SERIAL_TAG: &str = "Serial";
/// Tag marking a test as runnable in a process group.
pub const PARALLEL_TAG: &str = "Parallel";
/// Prefix of the target-case tag.
pub const CASE_TAG_PREFIX: &str = "Case_";
/// Prefix of the process-count tag.
pub const NPROCS_TAG_PREFIX: &str = "nProcs_";
/// Tag hiding a test from default selection.
pub const HIDDEN_TAG: &str = ".";

/// Ordered, de-duplicated set of tags on one test case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<String>,
}

impl TagSet {
    /// Empty tag set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a bracketed tag string.
    ///
    /// # Errors
    ///
    /// Returns an error on unbalanced brackets, empty tags, or text outside
    /// of brackets.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut set = Self::new();
        let mut rest = spec.trim();
        while !rest.is_empty() {
            let Some(after_open) = rest.strip_prefix('[') else {
                return Err(Error::InvalidTag(format!(
                    "expected '[' in tag string {spec:?}"
                )));
            };
            let Some(close) = after_open.find(']') else {
                return Err(Error::InvalidTag(format!("unclosed tag in {spec:?}")));
            };
            let tag = after_open[..close].trim();
            if tag.is_empty() || tag.contains('[') {
                return Err(Error::InvalidTag(format!("malformed tag in {spec:?}")));
            }
            set.insert(tag);
            rest = after_open[close + 1..].trim_start();
        }
        Ok(set)
    }

    /// Add a tag unless already present
    pub fn insert(&mut self, tag: &str) {
        if !self.contains(tag) {
            self.tags.push(tag.to_string());
        }
    }

    /// Case-insensitive membership test
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Tags in registration order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether there are no tags
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tagged `[Serial]`
    pub fn is_serial(&self) -> bool {
        self.contains(SERIAL_TAG)
    }

    /// Tagged `[Parallel]`
    pub fn is_parallel(&self) -> bool {
        self.contains(PARALLEL_TAG)
    }

    /// Hidden from default selection (`[.]` or `[!hide]`)
    pub fn is_hidden(&self) -> bool {
        self.contains("!hide") || self.tags.iter().any(|t| t.starts_with(HIDDEN_TAG))
    }

    /// Whether the test supports the given execution mode
    pub fn supports(&self, parallel: bool) -> bool {
        if parallel {
            self.is_parallel()
        } else {
            self.is_serial()
        }
    }

    /// Case name from a `[Case_<name>]` tag
    pub fn target_case(&self) -> Option<&str> {
        self.prefixed(CASE_TAG_PREFIX)
    }

    /// Group size from a `[nProcs_<N>]` tag
    pub fn required_procs(&self) -> Option<usize> {
        self.prefixed(NPROCS_TAG_PREFIX)?.parse().ok()
    }

    fn prefixed(&self, prefix: &str) -> Option<&str> {
        self.tags.iter().find_map(|t| {
            let head = t.get(..prefix.len())?;
            head.eq_ignore_ascii_case(prefix)
                .then(|| &t[prefix.len()..])
                .filter(|rest| !rest.is_empty())
        })
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tag in &self.tags {
            write!(f, "[{tag}]")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for TagSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Outcome of matching a test's tags against the running group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFit {
    /// The test may run
    Run,
    /// The test does not support the current execution mode
    WrongMode,
    /// The test was written for another group size
    WrongGroupSize {
        /// Size from the `[nProcs_N]` tag
        required: usize,
        /// Size of the running group
        actual: usize,
    },
}

impl TagSet {
    /// Check the tag convention against the running group.
    ///
    /// Enforcing the result is the test author's decision; the engine never
    /// calls this.
    pub fn fit(&self, group_size: usize) -> GroupFit {
        let parallel = group_size > 1;
        if !self.supports(parallel) {
            return GroupFit::WrongMode;
        }
        match self.required_procs() {
            Some(required) if parallel && required != group_size => GroupFit::WrongGroupSize {
                required,
                actual: group_size,
            },
            _ => GroupFit::Run,
        }
    }
}
