//! Registered test cases

use crate::context::TestContext;
use crate::error::{EngineError, Result};
use serpar_core::TagSet;
use std::collections::BTreeMap;
use std::panic::Location;

/// Body of a test case.
///
/// The body is called once per pass; see [`crate::tracker`] for how passes
/// select sections and generated values.
pub type TestFn = fn(&mut TestContext) -> anyhow::Result<()>;

/// A registered test case
#[derive(Clone)]
pub struct TestCase {
    name: String,
    tags: TagSet,
    body: TestFn,
    file: &'static str,
    line: u32,
}

impl TestCase {
    /// Test name, unique within a registry
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tags given at registration
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Test body
    pub fn body(&self) -> TestFn {
        self.body
    }

    /// Source file the test was registered from
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Source line the test was registered from
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("file", &self.file)
            .field("line", &self.line)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of test cases. Tests run in registration order.
#[derive(Debug, Clone, Default)]
pub struct TestRegistry {
    cases: Vec<TestCase>,
}

impl TestRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a test case.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the tag string is malformed.
    #[track_caller]
    pub fn register(&mut self, name: &str, tags: &str, body: TestFn) -> Result<&mut Self> {
        let at = Location::caller();
        if self.get(name).is_some() {
            return Err(EngineError::DuplicateTest(name.to_string()));
        }
        let tags = TagSet::parse(tags).map_err(|source| EngineError::InvalidTags {
            name: name.to_string(),
            source,
        })?;
        self.cases.push(TestCase {
            name: name.to_string(),
            tags,
            body,
            file: at.file(),
            line: at.line(),
        });
        Ok(self)
    }

    /// Test case by exact name
    pub fn get(&self, name: &str) -> Option<&TestCase> {
        self.cases.iter().find(|c| c.name == name)
    }

    /// All test cases in registration order
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Number of registered tests
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Every tag in use with the number of tests carrying it
    pub fn tag_counts(&self) -> Vec<(String, usize)> {
        tag_counts(&self.cases)
    }
}

/// Tags of `cases` with the number of cases carrying each, sorted by tag.
/// Tags that differ only in case are counted together under the first
/// spelling.
pub fn tag_counts<'a>(cases: impl IntoIterator<Item = &'a TestCase>) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<String, (String, usize)> = BTreeMap::new();
    for case in cases {
        for tag in case.tags.iter() {
            counts
                .entry(tag.to_lowercase())
                .or_insert_with(|| (tag.to_string(), 0))
                .1 += 1;
        }
    }
    counts.into_values().collect()
}
