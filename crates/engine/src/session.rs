//! Session: select, run and report registered tests
//!
//! Each selected test case gets a fresh [`TestContext`] and is run pass by
//! pass until its tracker tree completes. Errors and panics escaping the
//! body end the pass and count as failures of that test case only; the
//! session moves on to the remaining passes and test cases unless the
//! failure policy says to stop.

use crate::args::EngineArgs;
use crate::context::TestContext;
use crate::error::Result;
use crate::filter::TestSpec;
use crate::registry::{tag_counts, TestCase, TestRegistry};
use crate::reporter::{CaseReport, ConsoleReporter, RunReport, RunSummary};
use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// What a failed assertion does to the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Report failures and keep running every selected test
    #[default]
    Recoverable,
    /// Stop after this many failed assertions
    AbortAfter(u64),
}

impl FailurePolicy {
    fn should_abort(&self, failed_assertions: u64) -> bool {
        match self {
            FailurePolicy::Recoverable => false,
            FailurePolicy::AbortAfter(limit) => failed_assertions >= *limit,
        }
    }
}

/// Session settings
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Test selection
    pub spec: TestSpec,
    /// List tests instead of running them
    pub list_tests: bool,
    /// List tags instead of running tests
    pub list_tags: bool,
    /// Report passed assertions too
    pub include_successes: bool,
    /// Failure policy
    pub failure_policy: FailurePolicy,
    /// Where to write the JSON run report
    pub report_json: Option<PathBuf>,
    /// Prefix for console lines and report, e.g. `rank 1/2`
    pub rank_label: Option<String>,
}

impl SessionConfig {
    /// Settings from parsed command-line options.
    ///
    /// # Errors
    ///
    /// Returns an error if a test spec is malformed.
    pub fn from_args(args: &EngineArgs) -> Result<Self> {
        let failure_policy = if args.abort {
            FailurePolicy::AbortAfter(1)
        } else if let Some(n) = args.abortx {
            FailurePolicy::AbortAfter(n)
        } else {
            FailurePolicy::Recoverable
        };
        Ok(Self {
            spec: TestSpec::parse(&args.test_specs)?,
            list_tests: args.list_tests,
            list_tags: args.list_tags,
            include_successes: args.success,
            failure_policy,
            report_json: args.report_json.clone(),
            rank_label: None,
        })
    }
}

/// A configured run over a registry
#[derive(Debug)]
pub struct Session<'r> {
    registry: &'r TestRegistry,
    config: SessionConfig,
}

impl<'r> Session<'r> {
    /// Session over `registry`
    pub fn new(registry: &'r TestRegistry, config: SessionConfig) -> Self {
        Self { registry, config }
    }

    /// Settings in effect
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Test cases the spec selects, in registration order
    pub fn selected(&self) -> Vec<&'r TestCase> {
        self.registry
            .cases()
            .iter()
            .filter(|case| self.config.spec.matches(case))
            .collect()
    }

    /// Run the selected tests, reporting to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if output or the JSON report cannot be written.
    /// Test failures are not errors; they are counted in the summary.
    pub fn run(&self, out: &mut dyn Write) -> Result<RunSummary> {
        let selected = self.selected();
        let mut reporter = ConsoleReporter::new(
            out,
            self.config.rank_label.clone(),
            self.config.include_successes,
        );

        if self.config.list_tests {
            reporter.list_tests(&selected)?;
            return Ok(RunSummary::default());
        }
        if self.config.list_tags {
            reporter.list_tags(&tag_counts(selected.iter().copied()))?;
            return Ok(RunSummary::default());
        }

        info!(
            target: "serpar::engine",
            selected = selected.len(),
            registered = self.registry.len(),
            "Running tests"
        );
        let mut summary = RunSummary::default();
        let mut cases = Vec::with_capacity(selected.len());
        for case in selected {
            let report = self.run_case(case, &mut reporter, &mut summary)?;
            if report.passed {
                summary.test_cases.passed += 1;
            } else {
                summary.test_cases.failed += 1;
            }
            cases.push(report);
            if summary.aborted {
                warn!(
                    target: "serpar::engine",
                    failed_assertions = summary.assertions.failed,
                    "Aborting run"
                );
                break;
            }
        }
        reporter.summary(&summary)?;

        if let Some(path) = &self.config.report_json {
            RunReport {
                rank: self.config.rank_label.clone(),
                summary,
                test_cases: cases,
            }
            .write(path)?;
            debug!(target: "serpar::engine", path = %path.display(), "Report written");
        }
        Ok(summary)
    }

    fn run_case(
        &self,
        case: &TestCase,
        reporter: &mut ConsoleReporter<'_>,
        summary: &mut RunSummary,
    ) -> Result<CaseReport> {
        debug!(target: "serpar::engine", test = case.name(), "Test case started");
        let mut ctx = TestContext::new(case.name(), case.tags().clone());
        let body = case.body();
        let mut passed = true;
        let mut results = Vec::new();

        while !ctx.is_complete() {
            ctx.start_pass();
            match panic::catch_unwind(AssertUnwindSafe(|| body(&mut ctx))) {
                Ok(outcome) => ctx.finish_pass(outcome),
                Err(payload) => ctx.finish_panicked_pass(panic_message(payload.as_ref())),
            }
            for result in ctx.take_results() {
                reporter.assertion(case, &result)?;
                if result.passed {
                    summary.assertions.passed += 1;
                } else {
                    summary.assertions.failed += 1;
                    passed = false;
                }
                if !result.passed || self.config.include_successes {
                    results.push(result);
                }
            }
            if self.config.failure_policy.should_abort(summary.assertions.failed) {
                summary.aborted = true;
                break;
            }
        }

        info!(
            target: "serpar::engine",
            test = case.name(),
            passes = ctx.pass(),
            passed,
            "Test case finished"
        );
        Ok(CaseReport {
            name: case.name().to_string(),
            tags: case.tags().to_string(),
            location: format!("{}:{}", case.file(), case.line()),
            passes: ctx.pass(),
            passed,
            results,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
