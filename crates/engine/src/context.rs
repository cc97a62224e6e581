//! The handle a test body runs against
//!
//! A [`TestContext`] lives for one test case and across all of its passes.
//! It owns the tracker tree, the captured values of the current scope, and
//! the assertion results of the current pass.

use crate::error::{AssertionFailed, EngineError};
use crate::tracker::TrackerContext;
use serde::Serialize;
use serpar_core::{Sequence, TagSet};
use std::fmt::Debug;
use std::panic::Location;

/// A value recorded with `capture!`, shown with every assertion result in
/// its scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capture {
    /// Source text of the captured expression
    pub name: String,
    /// `Debug` rendering of the value
    pub value: String,
}

/// Outcome of one assertion, or of an error that ended a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionResult {
    /// Macro that produced it (`REQUIRE`, `CHECK`, ...), or `ERROR` / `PANIC`
    pub macro_name: &'static str,
    /// Source text of the checked expression, or the error message
    pub expression: String,
    /// Operand values of a comparison
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expansion: Option<String>,
    /// Whether the assertion held
    pub passed: bool,
    /// Source file
    pub file: String,
    /// Source line
    pub line: u32,
    /// Open sections, outermost first
    pub sections: Vec<String>,
    /// Values captured in scope
    pub captures: Vec<Capture>,
}

/// Per-test-case state handed to the body on every pass.
#[derive(Debug)]
pub struct TestContext {
    test_name: String,
    tags: TagSet,
    tracker: TrackerContext,
    captures: Vec<Capture>,
    results: Vec<AssertionResult>,
    unwinding: bool,
}

impl TestContext {
    /// Context for a fresh run of test `name`.
    pub fn new(name: &str, tags: TagSet) -> Self {
        Self {
            test_name: name.to_string(),
            tags,
            tracker: TrackerContext::new(name),
            captures: Vec::new(),
            results: Vec::new(),
            unwinding: false,
        }
    }

    /// Name of the running test case
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Tags of the running test case
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// One-based number of the current pass
    pub fn pass(&self) -> usize {
        self.tracker.passes()
    }

    /// Open sections, outermost first
    pub fn section_path(&self) -> Vec<String> {
        self.tracker.section_path()
    }

    /// Run `body` as section `name` if the tracker selects it for this pass.
    ///
    /// Values captured inside the section go out of scope when it ends. An
    /// error returned by `body` ends the section early and is passed on.
    pub fn section<F>(&mut self, name: &str, body: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut TestContext) -> anyhow::Result<()>,
    {
        let Some(id) = self.tracker.enter_section(name) else {
            return Ok(());
        };
        let scope = self.captures.len();
        let result = body(self);
        match result {
            Ok(()) => {
                self.captures.truncate(scope);
                self.unwinding = false;
                self.tracker.leave_section(id);
                Ok(())
            }
            Err(err) => {
                let first = !self.unwinding;
                if first {
                    self.record_error(&err);
                    self.unwinding = true;
                }
                self.captures.truncate(scope);
                self.tracker.end_section_early(id, first);
                Err(err)
            }
        }
    }

    /// Current value of the generator at this call site.
    ///
    /// The first pass that reaches the call takes the first value; the
    /// generator advances once everything after it has run for the current
    /// value. `values` is only stored the first time.
    ///
    /// # Errors
    ///
    /// Returns an error if the same call site generated values of another
    /// type before.
    #[track_caller]
    pub fn generate<T: Clone + 'static>(&mut self, values: Sequence<T>) -> Result<T, EngineError> {
        let location = Location::caller();
        let len = values.len();
        let id = self
            .tracker
            .acquire_generator(location, len, || Box::new(values));
        self.tracker
            .generator_value(id)
            .and_then(|(stored, index)| stored.downcast_ref::<Sequence<T>>()?.get(index).cloned())
            .ok_or_else(|| EngineError::GeneratorType {
                location: location.to_string(),
            })
    }

    /// Record a value shown with later assertion results in this scope.
    pub fn capture(&mut self, name: &str, value: impl Debug) {
        self.captures.push(Capture {
            name: name.to_string(),
            value: format!("{value:?}"),
        });
    }

    #[doc(hidden)]
    pub fn capture_rendered(&mut self, name: &str, value: String) {
        self.captures.push(Capture {
            name: name.to_string(),
            value,
        });
    }

    /// Assert `passed`; on failure the pass ends with [`AssertionFailed`].
    #[track_caller]
    pub fn require(&mut self, expression: &str, passed: bool) -> Result<(), AssertionFailed> {
        let at = Location::caller();
        self.record("REQUIRE", expression, None, passed, at);
        if passed {
            Ok(())
        } else {
            Err(AssertionFailed::new("REQUIRE", expression, at))
        }
    }

    /// Assert `left == right`, recording both operands.
    #[track_caller]
    pub fn require_eq<A, B>(&mut self, expression: &str, left: &A, right: &B) -> Result<(), AssertionFailed>
    where
        A: Debug + PartialEq<B> + ?Sized,
        B: Debug + ?Sized,
    {
        let at = Location::caller();
        let passed = left == right;
        let expansion = format!("{left:?} == {right:?}");
        self.record("REQUIRE_EQ", expression, Some(expansion), passed, at);
        if passed {
            Ok(())
        } else {
            Err(AssertionFailed::new("REQUIRE_EQ", expression, at))
        }
    }

    /// Check `passed`; a failure is recorded and the body continues.
    #[track_caller]
    pub fn check(&mut self, expression: &str, passed: bool) -> bool {
        self.record("CHECK", expression, None, passed, Location::caller());
        passed
    }

    /// Check `left == right`, recording both operands.
    #[track_caller]
    pub fn check_eq<A, B>(&mut self, expression: &str, left: &A, right: &B) -> bool
    where
        A: Debug + PartialEq<B> + ?Sized,
        B: Debug + ?Sized,
    {
        let passed = left == right;
        let expansion = format!("{left:?} == {right:?}");
        self.record("CHECK_EQ", expression, Some(expansion), passed, Location::caller());
        passed
    }

    fn record(
        &mut self,
        macro_name: &'static str,
        expression: &str,
        expansion: Option<String>,
        passed: bool,
        at: &Location<'static>,
    ) {
        self.results.push(AssertionResult {
            macro_name,
            expression: expression.to_string(),
            expansion,
            passed,
            file: at.file().to_string(),
            line: at.line(),
            sections: self.tracker.section_path(),
            captures: self.captures.clone(),
        });
    }

    /// Record an error that ended the pass. Failed `require!`s are already
    /// recorded.
    fn record_error(&mut self, err: &anyhow::Error) {
        if err.downcast_ref::<AssertionFailed>().is_some() {
            return;
        }
        self.push_failure("ERROR", format!("{err:#}"));
    }

    fn push_failure(&mut self, macro_name: &'static str, message: String) {
        self.results.push(AssertionResult {
            macro_name,
            expression: message,
            expansion: None,
            passed: false,
            file: String::new(),
            line: 0,
            sections: self.tracker.section_path(),
            captures: self.captures.clone(),
        });
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.tracker.is_complete()
    }

    pub(crate) fn start_pass(&mut self) {
        self.captures.clear();
        self.unwinding = false;
        self.tracker.start_pass();
    }

    /// Close the pass after the body returned.
    pub(crate) fn finish_pass(&mut self, outcome: anyhow::Result<()>) {
        match outcome {
            Ok(()) => self.tracker.end_pass(),
            Err(err) => {
                if !self.unwinding {
                    self.record_error(&err);
                }
                self.tracker.end_pass();
            }
        }
    }

    /// Close the pass after the body panicked.
    pub(crate) fn finish_panicked_pass(&mut self, message: String) {
        let first = !self.unwinding;
        if first {
            self.push_failure("PANIC", message);
        }
        self.tracker.abandon_pass(first);
    }

    pub(crate) fn take_results(&mut self) -> Vec<AssertionResult> {
        std::mem::take(&mut self.results)
    }
}
