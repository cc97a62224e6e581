//! Test session driver
//!
//! The entry point of a test binary. A run moves through
//!
//! ```text
//! Unstarted -(--parallel)-> CommInitialized -> Running -> CommFinalized -> Done
//!     \_____________________________________^         \_______________^
//! ```
//!
//! The communication runtime is touched only when `--parallel` is given; it
//! is then initialized once and finalized on every exit path after that.

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::logging;
use clap::Parser;
use serpar_comm::{CommContext, CommOptions};
use serpar_core::ProcessTopology;
use serpar_engine::{rank_report_path, EngineArgs, RunSummary, Session, SessionConfig, TestRegistry};
use serpar_fixture::{set_case_settings, FixtureError};
use serpar_foam::{set_fatal_policy, set_warning_level, FatalErrorPolicy};
use std::fmt;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{error, info, info_span, warn};

/// Exit status of a run that could not complete
const RUN_FAILED: u8 = 1;

/// Command line of a test binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Parser)]
#[command(about = "Run unit tests serially or as one member of a process group")]
pub struct Cli {
    /// Run as a member of a process group; initializes the communication
    /// runtime from the launch environment
    #[arg(short = 'p', long)]
    pub parallel: bool,

    /// Engine options
    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Where a run stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing has happened yet
    Unstarted,
    /// The communication runtime is up
    CommInitialized,
    /// Tests are running
    Running,
    /// The communication runtime was shut down
    CommFinalized,
    /// The exit code is known
    Done,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unstarted => "unstarted",
            SessionState::CommInitialized => "comm-initialized",
            SessionState::Running => "running",
            SessionState::CommFinalized => "comm-finalized",
            SessionState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Runs a registry of tests for one process.
#[derive(Debug)]
pub struct Driver {
    config: HarnessConfig,
    state: SessionState,
}

impl Driver {
    /// Driver with explicit settings
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            state: SessionState::Unstarted,
        }
    }

    /// Settings in effect
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Parse `args`, load the configuration from the environment, and run
    /// `registry`. Reports go to stdout.
    pub fn run<I, T>(registry: &TestRegistry, args: I) -> ExitCode
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let cli = match Cli::try_parse_from(&args) {
            Ok(cli) => cli,
            Err(e) => {
                // --help and --version land here too, with exit code 0
                let _ = e.print();
                return exit_code(e.exit_code());
            }
        };
        let config = match HarnessConfig::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("serpar: {e}");
                return ExitCode::FAILURE;
            }
        };
        let stdout = io::stdout();
        let mut out = stdout.lock();
        ExitCode::from(Driver::new(config).execute(registry, &cli, &args, &mut out))
    }

    /// Run `registry` as `cli` asks, writing reports to `out`. Returns the
    /// process exit status: the number of failed test cases capped at 255,
    /// or 1 if the run could not complete.
    ///
    /// `args` are handed to the communication runtime on initialization.
    pub fn execute(
        &mut self,
        registry: &TestRegistry,
        cli: &Cli,
        args: &[String],
        out: &mut dyn Write,
    ) -> u8 {
        logging::init(&self.config.log_level);
        set_fatal_policy(FatalErrorPolicy::from(self.config.fatal_errors));
        set_warning_level(self.config.warning_level);
        match set_case_settings(self.config.time_settings()) {
            Ok(()) | Err(FixtureError::SettingsAlreadySet) => {}
            Err(e) => warn!(target: "serpar::driver", error = %e, "Case settings not applied"),
        }

        let comm = if cli.parallel {
            let options = CommOptions {
                connect_timeout: self.config.connect_timeout(),
            };
            match CommContext::init(args, &options) {
                Ok(comm) => {
                    self.transition(SessionState::CommInitialized);
                    Some(comm)
                }
                Err(e) => {
                    error!(target: "serpar::driver", error = %e, "Communication runtime failed to start");
                    eprintln!("serpar: {e}");
                    self.transition(SessionState::Done);
                    return RUN_FAILED;
                }
            }
        } else {
            None
        };
        let topology = comm
            .as_ref()
            .map(CommContext::topology)
            .unwrap_or(ProcessTopology::SERIAL);

        let span = info_span!("serpar", rank = topology.rank());
        let outcome = span.in_scope(|| {
            self.transition(SessionState::Running);
            run_session(registry, &cli.engine, &topology, out)
        });

        if let Some(comm) = comm {
            if let Err(e) = comm.finalize() {
                warn!(target: "serpar::driver", error = %e, "Finalizing communication runtime failed");
            }
            self.transition(SessionState::CommFinalized);
        }
        self.transition(SessionState::Done);

        match outcome {
            Ok(summary) => {
                info!(
                    target: "serpar::driver",
                    passed = summary.test_cases.passed,
                    failed = summary.test_cases.failed,
                    "Run finished"
                );
                summary.exit_code()
            }
            Err(e) => {
                error!(target: "serpar::driver", error = %e, "Run failed");
                eprintln!("serpar: {e}");
                RUN_FAILED
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        info!(target: "serpar::driver", from = %self.state, to = %next, "Session state");
        self.state = next;
    }
}

fn run_session(
    registry: &TestRegistry,
    args: &EngineArgs,
    topology: &ProcessTopology,
    out: &mut dyn Write,
) -> Result<RunSummary> {
    let mut config = SessionConfig::from_args(args)?;
    if topology.is_parallel() {
        config.rank_label = Some(topology.to_string());
        config.report_json = config
            .report_json
            .map(|path| rank_report_path(&path, topology.rank(), topology.group_size()));
    }
    Ok(Session::new(registry, config).run(out)?)
}

fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map(ExitCode::from).unwrap_or(ExitCode::FAILURE)
}
