//! Process-wide communication runtime lifecycle
//!
//! The runtime is global, one-shot state: it is initialized at most once per
//! process and finalized at most once, after initialization. [`CommContext`]
//! is the scoped handle that owns it. Dropping the context finalizes the
//! runtime, so release happens on every exit path.
//!
//! A process that never initializes the runtime runs in single-process
//! mode: [`world`] returns a serial communicator and [`is_parallel`] is
//! false.
//!
//! Members of a TCP group learn their place from the launch environment set
//! by `serpar-launch`:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `SERPAR_RANK` | zero-based rank of this process |
//! | `SERPAR_SIZE` | number of processes in the group |
//! | `SERPAR_RENDEZVOUS` | `host:port` rank 0 listens on |

use crate::communicator::{Communicator, SerialComm};
use crate::error::{CommError, Result};
use crate::tcp::{TcpComm, DEFAULT_CONNECT_TIMEOUT};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serpar_core::ProcessTopology;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Rank variable of the launch environment
pub const ENV_RANK: &str = "SERPAR_RANK";
/// Group size variable of the launch environment
pub const ENV_SIZE: &str = "SERPAR_SIZE";
/// Rendezvous address variable of the launch environment
pub const ENV_RENDEZVOUS: &str = "SERPAR_RENDEZVOUS";

enum RuntimeState {
    Uninitialized,
    Active(Arc<dyn Communicator>),
    Finalized,
}

static RUNTIME: Lazy<Mutex<RuntimeState>> = Lazy::new(|| Mutex::new(RuntimeState::Uninitialized));

/// The communicator of this process: the active runtime, or a serial one.
pub fn world() -> Arc<dyn Communicator> {
    match &*RUNTIME.lock() {
        RuntimeState::Active(comm) => Arc::clone(comm),
        RuntimeState::Uninitialized | RuntimeState::Finalized => Arc::new(SerialComm),
    }
}

/// Whether an initialized runtime spans more than one process.
pub fn is_parallel() -> bool {
    world().is_parallel()
}

/// Topology of this process as seen by [`world`].
pub fn topology() -> ProcessTopology {
    world().topology()
}

/// Where this process sits in a launched group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEnv {
    /// Zero-based rank
    pub rank: usize,
    /// Group size
    pub size: usize,
    /// Address rank 0 listens on; `None` for a group of one
    pub rendezvous: Option<SocketAddr>,
}

impl LaunchEnv {
    /// Launch environment of a process started without `serpar-launch`.
    pub fn single() -> Self {
        Self {
            rank: 0,
            size: 1,
            rendezvous: None,
        }
    }

    /// Read the launch environment of this process.
    ///
    /// Missing variables mean a group of one.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed, or the group has more
    /// than one member but no rendezvous address.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the launch environment through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`LaunchEnv::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let parse_usize = |var: &'static str| -> Result<Option<usize>> {
            lookup(var)
                .map(|raw| {
                    raw.trim().parse::<usize>().map_err(|e| CommError::LaunchEnv {
                        var,
                        reason: format!("{raw:?}: {e}"),
                    })
                })
                .transpose()
        };
        let size = parse_usize(ENV_SIZE)?.unwrap_or(1);
        let rank = parse_usize(ENV_RANK)?.unwrap_or(0);
        ProcessTopology::new(rank, size)?;

        let rendezvous = lookup(ENV_RENDEZVOUS)
            .map(|raw| {
                raw.trim()
                    .parse::<SocketAddr>()
                    .map_err(|e| CommError::LaunchEnv {
                        var: ENV_RENDEZVOUS,
                        reason: format!("{raw:?}: {e}"),
                    })
            })
            .transpose()?;
        if size > 1 && rendezvous.is_none() {
            return Err(CommError::LaunchEnv {
                var: ENV_RENDEZVOUS,
                reason: format!("required for a group of {size}"),
            });
        }
        Ok(Self {
            rank,
            size,
            rendezvous,
        })
    }

    /// Environment variables that place a child process at `rank`.
    pub fn child_vars(rank: usize, size: usize, rendezvous: SocketAddr) -> [(&'static str, String); 3] {
        [
            (ENV_RANK, rank.to_string()),
            (ENV_SIZE, size.to_string()),
            (ENV_RENDEZVOUS, rendezvous.to_string()),
        ]
    }
}

/// Options for runtime initialization.
#[derive(Debug, Clone)]
pub struct CommOptions {
    /// How long non-root ranks retry the rendezvous
    pub connect_timeout: Duration,
}

impl Default for CommOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// Scoped ownership of the process-wide communication runtime.
///
/// Finalizes the runtime when dropped unless [`CommContext::finalize`] was
/// called explicitly.
pub struct CommContext {
    comm: Arc<dyn Communicator>,
    args: Vec<String>,
    finalized: bool,
}

impl CommContext {
    /// Initialize the runtime from the launch environment.
    ///
    /// `args` are the process arguments, handed through to the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CommError::AlreadyInitialized`] if the runtime was ever
    /// initialized in this process, or the error of joining the group.
    pub fn init(args: &[String], options: &CommOptions) -> Result<Self> {
        let env = LaunchEnv::from_env()?;
        Self::init_with(args, || {
            let comm: Arc<dyn Communicator> = match env.rendezvous {
                Some(addr) if env.size > 1 => Arc::new(TcpComm::join(
                    addr,
                    env.rank,
                    env.size,
                    options.connect_timeout,
                )?),
                _ => Arc::new(SerialComm),
            };
            Ok(comm)
        })
    }

    /// Initialize the runtime with a communicator built by `make`.
    ///
    /// `make` runs only if the runtime was never initialized.
    ///
    /// # Errors
    ///
    /// Returns [`CommError::AlreadyInitialized`] on a second initialization,
    /// or the error returned by `make`.
    pub fn init_with(
        args: &[String],
        make: impl FnOnce() -> Result<Arc<dyn Communicator>>,
    ) -> Result<Self> {
        let mut state = RUNTIME.lock();
        if !matches!(*state, RuntimeState::Uninitialized) {
            return Err(CommError::AlreadyInitialized);
        }
        debug!(target: "serpar::comm", ?args, "Initializing communication runtime");
        let comm = make()?;
        *state = RuntimeState::Active(Arc::clone(&comm));
        info!(
            target: "serpar::comm",
            rank = comm.rank(),
            size = comm.size(),
            "Communication runtime initialized"
        );
        Ok(Self {
            comm,
            args: args.to_vec(),
            finalized: false,
        })
    }

    /// The communicator owned by this context
    pub fn comm(&self) -> &Arc<dyn Communicator> {
        &self.comm
    }

    /// Arguments the runtime was initialized with
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Topology of this process
    pub fn topology(&self) -> ProcessTopology {
        self.comm.topology()
    }

    /// Finalize now, reporting errors instead of logging them.
    ///
    /// # Errors
    ///
    /// Returns the error of the closing collective.
    pub fn finalize(mut self) -> Result<()> {
        self.finalize_inner()
    }

    fn finalize_inner(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        *RUNTIME.lock() = RuntimeState::Finalized;
        let result = self.comm.finalize();
        info!(target: "serpar::comm", ok = result.is_ok(), "Communication runtime finalized");
        result
    }
}

impl Drop for CommContext {
    fn drop(&mut self) {
        if let Err(e) = self.finalize_inner() {
            warn!(target: "serpar::comm", error = %e, "Finalizing communication runtime failed");
        }
    }
}

impl std::fmt::Debug for CommContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommContext")
            .field("topology", &self.comm.topology())
            .field("finalized", &self.finalized)
            .finish()
    }
}
