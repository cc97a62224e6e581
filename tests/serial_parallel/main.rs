//! Serial/parallel harness test
//!
//! This binary is its own test driver. Run without arguments it acts as the
//! orchestrator: it re-runs itself as member processes for each scenario
//! and checks their exit codes and run reports.
//!
//! - serial: one member on the undecomposed cavity case
//! - parallel: two members, each on its `processor<rank>` share
//! - fatal path: two members on a case that was never decomposed; the mesh
//!   test fails on every rank, the group tests still pass
//!
//! In the group scenarios the members also cross-check the values their
//! generators handed out, pass by pass.
//!
//! ```bash
//! cargo test --test serial_parallel
//!
//! # One member by hand, from the case directory
//! SERPAR_HARNESS_MEMBER=1 target/debug/deps/serial_parallel-<hash> "[Serial]"
//! ```

mod cases;
mod launch;

use launch::{Outcome, Scenario, ENV_MEMBER};
use serde_json::Value;
use serpar::Driver;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;

fn main() -> ExitCode {
    if std::env::var_os(ENV_MEMBER).is_some() {
        return Driver::run(&cases::registry(), std::env::args());
    }
    match orchestrate() {
        Ok(failures) if failures.is_empty() => {
            println!("serial_parallel: all scenarios passed");
            ExitCode::SUCCESS
        }
        Ok(failures) => {
            for failure in &failures {
                eprintln!("serial_parallel: {failure}");
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("serial_parallel: cannot launch members: {e}");
            ExitCode::FAILURE
        }
    }
}

fn orchestrate() -> std::io::Result<Vec<String>> {
    let work = TempDir::new()?;
    let cases_dir = launch::cases_dir();
    let mut failures = Vec::new();

    // Serial
    let report = work.path().join("serial.json");
    let outcome = launch::run(&Scenario {
        name: "serial",
        case_root: &cases_dir,
        case_name: "cavity",
        group_size: 1,
        args: report_args("[Serial]", &report),
    })?;
    expect_success("serial", &outcome, &mut failures);
    expect_report(&report, 3, 0, &mut failures);

    // Parallel, two ranks
    let report = work.path().join("parallel.json");
    let outcome = launch::run(&Scenario {
        name: "parallel",
        case_root: &cases_dir,
        case_name: "cavity",
        group_size: 2,
        args: parallel_args(&report),
    })?;
    expect_success("parallel", &outcome, &mut failures);
    for rank in 0..2 {
        let rank_report = work.path().join(format!("parallel.rank{rank}.json"));
        expect_report(&rank_report, 3, 0, &mut failures);
    }

    // Fatal path: no processor directories
    let undecomposed = undecomposed_case(work.path())?;
    let report = work.path().join("fatal.json");
    let outcome = launch::run(&Scenario {
        name: "fatal path",
        case_root: &undecomposed,
        case_name: "cavity",
        group_size: 2,
        args: parallel_args(&report),
    })?;
    if !outcome.all_failed() {
        failures.push(format!(
            "fatal path: expected every member to exit non-zero, got {:?}",
            outcome.statuses
        ));
    }
    for rank in 0..2 {
        let rank_report = work.path().join(format!("fatal.rank{rank}.json"));
        expect_report(&rank_report, 2, 1, &mut failures);
        expect_failed_test(&rank_report, cases::MESH_TEST, &mut failures);
    }

    Ok(failures)
}

fn report_args(spec: &str, report: &Path) -> Vec<String> {
    vec![
        spec.to_string(),
        "--report-json".to_string(),
        report.display().to_string(),
    ]
}

fn parallel_args(report: &Path) -> Vec<String> {
    let mut args = vec!["--parallel".to_string()];
    args.extend(report_args("[Parallel]", report));
    args
}

fn undecomposed_case(root: &Path) -> std::io::Result<std::path::PathBuf> {
    let source = launch::cases_dir().join("cavity");
    let target_root = root.join("undecomposed");
    let target = target_root.join("cavity");
    for sub in ["system", "constant/polyMesh"] {
        fs::create_dir_all(target.join(sub))?;
    }
    for file in ["system/controlDict", "constant/polyMesh/cells"] {
        fs::copy(source.join(file), target.join(file))?;
    }
    Ok(target_root)
}

fn expect_success(name: &str, outcome: &Outcome, failures: &mut Vec<String>) {
    if !outcome.all_succeeded() {
        failures.push(format!(
            "{name}: expected every member to exit 0, got {:?}",
            outcome.statuses
        ));
    }
}

fn read_report(path: &Path) -> Result<Value, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))
}

fn expect_report(path: &Path, passed: u64, failed: u64, failures: &mut Vec<String>) {
    let report = match read_report(path) {
        Ok(report) => report,
        Err(e) => return failures.push(e),
    };
    let counts = &report["summary"]["test_cases"];
    if counts["passed"] != passed || counts["failed"] != failed {
        failures.push(format!(
            "{}: expected {passed} passed and {failed} failed test cases, got {counts}",
            path.display()
        ));
    }
}

fn expect_failed_test(path: &Path, name: &str, failures: &mut Vec<String>) {
    let Ok(report) = read_report(path) else {
        return;
    };
    let failed = report["test_cases"]
        .as_array()
        .map(|cases| {
            cases
                .iter()
                .any(|case| case["name"] == name && case["passed"] == false)
        })
        .unwrap_or(false);
    if !failed {
        failures.push(format!("{}: expected {name:?} to fail", path.display()));
    }
}
