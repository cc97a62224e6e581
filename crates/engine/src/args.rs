//! Command-line options of the engine
//!
//! [`EngineArgs`] is a clap argument group; a driver flattens it into its own
//! parser next to the options it adds.

use clap::Args;
use std::path::PathBuf;

/// Engine options
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct EngineArgs {
    /// Test names, wildcard patterns or tags to run; all visible tests if
    /// none are given
    #[arg(value_name = "TEST_SPEC")]
    pub test_specs: Vec<String>,

    /// List the selected tests instead of running them
    #[arg(short = 'l', long = "list-tests")]
    pub list_tests: bool,

    /// List the tags of the selected tests instead of running them
    #[arg(short = 't', long = "list-tags")]
    pub list_tags: bool,

    /// Report passing assertions too
    #[arg(short = 's', long)]
    pub success: bool,

    /// Stop at the first failed assertion
    #[arg(short = 'a', long, conflicts_with = "abortx")]
    pub abort: bool,

    /// Stop after N failed assertions
    #[arg(short = 'x', long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub abortx: Option<u64>,

    /// Write a JSON run report to PATH
    #[arg(long, value_name = "PATH")]
    pub report_json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        engine: EngineArgs,
    }

    #[test]
    fn test_parse_full() {
        let cli = Cli::try_parse_from([
            "harness",
            "[Serial]",
            "Support*",
            "--success",
            "-x",
            "3",
            "--report-json",
            "out.json",
        ])
        .unwrap();
        assert_eq!(cli.engine.test_specs, vec!["[Serial]", "Support*"]);
        assert!(cli.engine.success);
        assert_eq!(cli.engine.abortx, Some(3));
        assert_eq!(cli.engine.report_json, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["harness"]).unwrap();
        assert_eq!(cli.engine, EngineArgs::default());
    }

    #[test]
    fn test_abort_conflicts_with_abortx() {
        assert!(Cli::try_parse_from(["harness", "-a", "-x", "2"]).is_err());
        assert!(Cli::try_parse_from(["harness", "-x", "0"]).is_err());
    }
}
