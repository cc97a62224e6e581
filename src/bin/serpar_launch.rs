//! serpar-launch: start N copies of a command as one process group.
//!
//! ```text
//! serpar-launch -n 2 -- target/debug/serial_parallel --parallel "[Parallel]"
//! ```
//!
//! Each child gets `SERPAR_RANK`, `SERPAR_SIZE`, and `SERPAR_RENDEZVOUS` in
//! its environment. The launcher waits for every child and exits with the
//! first non-zero child status (or 0).

use anyhow::{bail, Context};
use clap::Parser;
use serpar::comm::LaunchEnv;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::process::{self, Child, Command};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "serpar-launch", about = "Run N copies of a command as one process group")]
struct LaunchArgs {
    /// Number of processes
    #[arg(short = 'n', long = "np", default_value_t = 2)]
    np: usize,

    /// Address rank 0 listens on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    host: IpAddr,

    /// Port rank 0 listens on (default: any free port)
    #[arg(long)]
    port: Option<u16>,

    /// Command and arguments to run
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    let args = LaunchArgs::parse();
    match launch(&args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            process::exit(1);
        }
    }
}

fn launch(args: &LaunchArgs) -> anyhow::Result<i32> {
    if args.np == 0 {
        bail!("need at least one process");
    }
    let rendezvous = match args.port {
        Some(port) => SocketAddr::new(args.host, port),
        // The port is released again before rank 0 binds it; a concurrent
        // launcher could grab it in between.
        None => TcpListener::bind(SocketAddr::new(args.host, 0))
            .and_then(|l| l.local_addr())
            .context("failed to pick a rendezvous port")?,
    };
    let (program, program_args) = args
        .command
        .split_first()
        .context("missing command")?;

    info!(np = args.np, %rendezvous, program, "Launching process group");
    let mut children: Vec<Child> = Vec::with_capacity(args.np);
    for rank in 0..args.np {
        let spawned = Command::new(program)
            .args(program_args)
            .envs(LaunchEnv::child_vars(rank, args.np, rendezvous))
            .spawn();
        match spawned {
            Ok(child) => children.push(child),
            Err(e) => {
                for mut child in children {
                    let _ = child.kill();
                    let _ = child.wait();
                }
                return Err(e).with_context(|| format!("failed to spawn rank {rank}"));
            }
        }
    }

    let mut exit_code = 0;
    for (rank, mut child) in children.into_iter().enumerate() {
        let status = child
            .wait()
            .with_context(|| format!("failed to wait for rank {rank}"))?;
        let code = status.code().unwrap_or(1);
        if code != 0 {
            error!(rank, code, "Rank exited with failure");
            if exit_code == 0 {
                exit_code = code;
            }
        }
    }
    Ok(exit_code)
}
