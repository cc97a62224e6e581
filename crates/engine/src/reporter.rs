//! Console reporter and JSON run report
//!
//! Every line of console output is prefixed with the rank label when one is
//! set, so the interleaved output of a process group stays attributable.
//! Reports are not deduplicated across ranks.

use crate::context::AssertionResult;
use crate::error::{EngineError, Result};
use crate::registry::TestCase;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const RULE: &str =
    "-------------------------------------------------------------------------------";
const DOTS: &str =
    "...............................................................................";
const DOUBLE_RULE: &str =
    "===============================================================================";

/// Passed and failed counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    /// Number passed
    pub passed: u64,
    /// Number failed
    pub failed: u64,
}

impl Counts {
    /// Passed plus failed
    pub fn total(&self) -> u64 {
        self.passed + self.failed
    }
}

/// Aggregate result of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Test case counts
    pub test_cases: Counts,
    /// Assertion counts
    pub assertions: Counts,
    /// Whether the failure policy stopped the run early
    pub aborted: bool,
}

impl RunSummary {
    /// Whether every selected test passed
    pub fn is_success(&self) -> bool {
        self.test_cases.failed == 0
    }

    /// Process exit code: the number of failed test cases, capped at 255
    pub fn exit_code(&self) -> u8 {
        u8::try_from(self.test_cases.failed).unwrap_or(u8::MAX)
    }
}

/// Results of one test case across all of its passes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseReport {
    /// Test name
    pub name: String,
    /// Tags as registered
    pub tags: String,
    /// Registration site
    pub location: String,
    /// Number of passes run
    pub passes: usize,
    /// Whether every assertion held and no pass ended in an error
    pub passed: bool,
    /// Failed results, plus passed ones when successes are reported
    pub results: Vec<AssertionResult>,
}

/// JSON run report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Rank label of the process that wrote the report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
    /// Aggregate counts
    pub summary: RunSummary,
    /// Per-test results in run order
    pub test_cases: Vec<CaseReport>,
}

impl RunReport {
    /// Write the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| EngineError::Report {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Per-rank report path: `report.json` becomes `report.rank1.json` in a
/// group of more than one process.
pub fn rank_report_path(path: &Path, rank: usize, group_size: usize) -> PathBuf {
    if group_size <= 1 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.rank{rank}.{}", ext.to_string_lossy()),
        None => format!("{stem}.rank{rank}"),
    };
    path.with_file_name(name)
}

/// Human-readable console output
pub struct ConsoleReporter<'w> {
    out: &'w mut dyn Write,
    rank_label: Option<String>,
    include_successes: bool,
}

impl<'w> ConsoleReporter<'w> {
    /// Reporter writing to `out`
    pub fn new(out: &'w mut dyn Write, rank_label: Option<String>, include_successes: bool) -> Self {
        Self {
            out,
            rank_label,
            include_successes,
        }
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        match &self.rank_label {
            Some(label) => writeln!(self.out, "[{label}] {text}"),
            None => writeln!(self.out, "{text}"),
        }
    }

    /// Report one assertion result; passed ones only with `--success`.
    pub fn assertion(&mut self, case: &TestCase, result: &AssertionResult) -> io::Result<()> {
        if result.passed && !self.include_successes {
            return Ok(());
        }
        self.line(RULE)?;
        self.line(case.name())?;
        for section in &result.sections {
            self.line(&format!("  {section}"))?;
        }
        self.line(RULE)?;
        self.line(&format!("{}:{}", case.file(), case.line()))?;
        self.line(DOTS)?;
        self.line("")?;

        let status = if result.passed { "PASSED" } else { "FAILED" };
        match result.macro_name {
            "ERROR" | "PANIC" => {
                self.line(&format!("{status}:"))?;
                let cause = if result.macro_name == "PANIC" {
                    "due to panic with message:"
                } else {
                    "due to unexpected error with message:"
                };
                self.line(&format!("  {cause}"))?;
                for message_line in result.expression.lines() {
                    self.line(&format!("    {message_line}"))?;
                }
            }
            macro_name => {
                self.line(&format!("{}:{}: {status}:", result.file, result.line))?;
                self.line(&format!("  {macro_name}( {} )", result.expression))?;
                if let Some(expansion) = &result.expansion {
                    self.line("with expansion:")?;
                    self.line(&format!("  {expansion}"))?;
                }
            }
        }
        if !result.captures.is_empty() {
            self.line("with messages:")?;
            for capture in &result.captures {
                self.line(&format!("  {} := {}", capture.name, capture.value))?;
            }
        }
        self.line("")
    }

    /// Final summary
    pub fn summary(&mut self, summary: &RunSummary) -> io::Result<()> {
        self.line(DOUBLE_RULE)?;
        if summary.test_cases.total() == 0 {
            return self.line("No tests ran");
        }
        if summary.is_success() && summary.assertions.failed == 0 {
            return self.line(&format!(
                "All tests passed ({} assertion{} in {} test case{})",
                summary.assertions.passed,
                plural(summary.assertions.passed),
                summary.test_cases.passed,
                plural(summary.test_cases.passed),
            ));
        }
        self.line(&format!(
            "test cases: {} | {} passed | {} failed",
            summary.test_cases.total(),
            summary.test_cases.passed,
            summary.test_cases.failed
        ))?;
        self.line(&format!(
            "assertions: {} | {} passed | {} failed",
            summary.assertions.total(),
            summary.assertions.passed,
            summary.assertions.failed
        ))?;
        if summary.aborted {
            self.line("Run aborted by the failure policy")?;
        }
        Ok(())
    }

    /// `--list-tests` output
    pub fn list_tests(&mut self, cases: &[&TestCase]) -> io::Result<()> {
        self.line("Matching test cases:")?;
        for case in cases {
            self.line(&format!("  {}", case.name()))?;
            if !case.tags().is_empty() {
                self.line(&format!("      {}", case.tags()))?;
            }
        }
        self.line(&format!("{} matching test case{}", cases.len(), plural(cases.len() as u64)))
    }

    /// `--list-tags` output
    pub fn list_tags(&mut self, counts: &[(String, usize)]) -> io::Result<()> {
        self.line("Tags for matching test cases:")?;
        for (tag, count) in counts {
            self.line(&format!("  {count:>3}  [{tag}]"))?;
        }
        self.line(&format!("{} tag{}", counts.len(), plural(counts.len() as u64)))
    }
}

fn plural(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
