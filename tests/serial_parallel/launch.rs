//! Re-running this test binary as member processes.

use serpar::comm::LaunchEnv;
use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

/// Marks a process as a member run rather than the orchestrator
pub const ENV_MEMBER: &str = "SERPAR_HARNESS_MEMBER";

/// A member stuck in a collective is killed after this long
const MEMBER_TIMEOUT: Duration = Duration::from_secs(120);

/// How to launch one scenario
pub struct Scenario<'a> {
    pub name: &'a str,
    pub case_root: &'a Path,
    pub case_name: &'a str,
    pub group_size: usize,
    pub args: Vec<String>,
}

/// Exit status of each member, in rank order
pub struct Outcome {
    pub statuses: Vec<Option<ExitStatus>>,
}

impl Outcome {
    pub fn all_succeeded(&self) -> bool {
        self.statuses
            .iter()
            .all(|s| s.map(|s| s.success()).unwrap_or(false))
    }

    pub fn all_failed(&self) -> bool {
        self.statuses
            .iter()
            .all(|s| s.map(|s| !s.success()).unwrap_or(false))
    }
}

fn member_command(scenario: &Scenario<'_>) -> std::io::Result<Command> {
    let exe = std::env::current_exe()?;
    let mut command = Command::new(exe);
    command
        .args(&scenario.args)
        .env(ENV_MEMBER, "1")
        .env("SERPAR_CASE_ROOT", scenario.case_root)
        .env("SERPAR_CASE_NAME", scenario.case_name)
        .env_remove("SERPAR_CONFIG");
    Ok(command)
}

fn free_rendezvous() -> std::io::Result<SocketAddr> {
    TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))?.local_addr()
}

/// Launch the scenario's members and wait for all of them.
pub fn run(scenario: &Scenario<'_>) -> std::io::Result<Outcome> {
    println!(
        "serial_parallel: {} ({} member{})",
        scenario.name,
        scenario.group_size,
        if scenario.group_size == 1 { "" } else { "s" }
    );
    let mut children: Vec<Child> = Vec::with_capacity(scenario.group_size);
    if scenario.group_size == 1 {
        children.push(
            member_command(scenario)?
                .env_remove("SERPAR_RANK")
                .env_remove("SERPAR_SIZE")
                .env_remove("SERPAR_RENDEZVOUS")
                .spawn()?,
        );
    } else {
        let rendezvous = free_rendezvous()?;
        for rank in 0..scenario.group_size {
            let mut command = member_command(scenario)?;
            command.envs(LaunchEnv::child_vars(rank, scenario.group_size, rendezvous));
            children.push(command.spawn()?);
        }
    }
    let deadline = Instant::now() + MEMBER_TIMEOUT;
    let statuses = children
        .iter_mut()
        .map(|child| wait_until(child, deadline))
        .collect::<std::io::Result<Vec<_>>>()?;
    Ok(Outcome { statuses })
}

fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            child.kill()?;
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(Duration::from_millis(50));
    }
}

/// Directory holding the checked-in cases
pub fn cases_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("cases")
}
