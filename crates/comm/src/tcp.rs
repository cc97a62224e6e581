//! Process group over TCP
//!
//! Rank 0 listens on the rendezvous address and every other rank connects to
//! it (a star). Each collective is a gather to rank 0 followed by a reply to
//! every rank:
//!
//! 1. ranks `1..size` send their contribution frame
//! 2. rank 0 reads the frames in rank order, combining them with its own
//! 3. rank 0 sends the combined values back to each rank
//!
//! Combining in rank order keeps floating point sums identical across runs.

use crate::communicator::{Communicator, ReduceOp};
use crate::error::{CommError, Result};
use crate::frame::{bits_to_f64s, f64s_to_bits, read_frame, write_frame, Frame, FrameKind};
use parking_lot::Mutex;
use serpar_core::ProcessTopology;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Delay between connection attempts of non-root ranks
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(25);

/// Default time non-root ranks keep retrying the rendezvous
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

enum Links {
    /// Rank 0: one stream per peer, indexed by `rank - 1`
    Root(Vec<TcpStream>),
    /// Other ranks: the stream to rank 0
    Leaf(TcpStream),
}

/// A [`Communicator`] whose members talk over TCP.
pub struct TcpComm {
    topology: ProcessTopology,
    links: Mutex<Option<Links>>,
}

impl TcpComm {
    /// Join a group as rank 0, accepting the other `size - 1` members on an
    /// already bound listener.
    ///
    /// # Errors
    ///
    /// Returns an error if a peer's hello is malformed or a rank connects
    /// twice.
    pub fn accept(listener: TcpListener, size: usize) -> Result<Self> {
        let topology = ProcessTopology::new(0, size)?;
        let mut peers: Vec<Option<TcpStream>> = (1..size).map(|_| None).collect();
        let mut joined = 0;
        while joined < size - 1 {
            let (mut stream, peer_addr) = listener.accept()?;
            stream.set_nodelay(true)?;
            let hello = read_frame(&mut stream)?;
            let (rank, peer_size) = match (hello.kind, hello.values.as_slice()) {
                (FrameKind::Hello, [rank, peer_size]) => (*rank as usize, *peer_size as usize),
                _ => {
                    return Err(CommError::Protocol(format!(
                        "expected hello from {peer_addr}, got {}",
                        hello.describe()
                    )))
                }
            };
            if peer_size != size {
                return Err(CommError::Protocol(format!(
                    "rank {rank} believes the group has {peer_size} members, not {size}"
                )));
            }
            let slot = rank
                .checked_sub(1)
                .and_then(|i| peers.get_mut(i))
                .ok_or_else(|| CommError::Protocol(format!("unexpected rank {rank}")))?;
            if slot.is_some() {
                return Err(CommError::Protocol(format!("rank {rank} connected twice")));
            }
            debug!(target: "serpar::comm", rank, %peer_addr, "Peer joined");
            *slot = Some(stream);
            joined += 1;
        }
        let streams = peers.into_iter().flatten().collect();
        info!(target: "serpar::comm", size, "Process group formed");
        Ok(Self {
            topology,
            links: Mutex::new(Some(Links::Root(streams))),
        })
    }

    /// Join a group as a non-root rank, retrying until rank 0 listens.
    ///
    /// # Errors
    ///
    /// Returns [`CommError::ConnectTimeout`] if rank 0 does not accept within
    /// `timeout`.
    pub fn connect(addr: SocketAddr, rank: usize, size: usize, timeout: Duration) -> Result<Self> {
        let topology = ProcessTopology::new(rank, size)?;
        if rank == 0 {
            return Err(CommError::Protocol(
                "rank 0 must accept, not connect".to_string(),
            ));
        }
        let started = Instant::now();
        let mut stream = loop {
            match TcpStream::connect(addr) {
                Ok(stream) => break stream,
                Err(e) if started.elapsed() < timeout => {
                    debug!(target: "serpar::comm", rank, error = %e, "Rendezvous not ready, retrying");
                    thread::sleep(CONNECT_RETRY_DELAY);
                }
                Err(_) => {
                    return Err(CommError::ConnectTimeout {
                        addr,
                        waited_ms: started.elapsed().as_millis() as u64,
                    })
                }
            }
        };
        stream.set_nodelay(true)?;
        write_frame(&mut stream, &Frame::hello(rank, size))?;
        info!(target: "serpar::comm", rank, size, %addr, "Joined process group");
        Ok(Self {
            topology,
            links: Mutex::new(Some(Links::Leaf(stream))),
        })
    }

    /// Join the group described by rank, size, and rendezvous address.
    ///
    /// # Errors
    ///
    /// Propagates bind, accept, and connect failures.
    pub fn join(addr: SocketAddr, rank: usize, size: usize, timeout: Duration) -> Result<Self> {
        if rank == 0 {
            let listener = TcpListener::bind(addr)?;
            Self::accept(listener, size)
        } else {
            Self::connect(addr, rank, size, timeout)
        }
    }

    /// Run one collective: send `frame`, receive the combined values.
    fn collective(&self, frame: Frame) -> Result<Vec<u64>> {
        let mut guard = self.links.lock();
        let links = guard.as_mut().ok_or(CommError::Finalized)?;
        match links {
            Links::Leaf(stream) => {
                write_frame(stream, &frame)?;
                let reply = read_frame(stream)?;
                if reply.kind != FrameKind::Reply || reply.values.len() != frame.values.len() {
                    return Err(CommError::Protocol(format!(
                        "expected reply to {}, got {}",
                        frame.describe(),
                        reply.describe()
                    )));
                }
                Ok(reply.values)
            }
            Links::Root(peers) => {
                let mut combined = frame.values.clone();
                for (i, peer) in peers.iter_mut().enumerate() {
                    let contribution = read_frame(peer)?;
                    if !contribution.same_call(&frame) {
                        return Err(CommError::CollectiveMismatch {
                            rank: i + 1,
                            expected: frame.describe(),
                            found: contribution.describe(),
                        });
                    }
                    combine(&frame, &mut combined, &contribution.values);
                }
                let reply = Frame::new(FrameKind::Reply, frame.op, combined.clone());
                for peer in peers.iter_mut() {
                    write_frame(peer, &reply)?;
                }
                Ok(combined)
            }
        }
    }
}

fn combine(frame: &Frame, acc: &mut [u64], other: &[u64]) {
    match frame.kind {
        FrameKind::ReduceF64 => {
            for (a, b) in acc.iter_mut().zip(other) {
                *a = frame
                    .op
                    .combine_f64(f64::from_bits(*a), f64::from_bits(*b))
                    .to_bits();
            }
        }
        FrameKind::ReduceU64 => {
            for (a, b) in acc.iter_mut().zip(other) {
                *a = frame.op.combine_u64(*a, *b);
            }
        }
        _ => {}
    }
}

impl Communicator for TcpComm {
    fn rank(&self) -> usize {
        self.topology.rank()
    }

    fn size(&self) -> usize {
        self.topology.group_size()
    }

    fn barrier(&self) -> Result<()> {
        self.collective(Frame::control(FrameKind::Barrier))?;
        Ok(())
    }

    fn all_reduce_f64(&self, values: &mut [f64], op: ReduceOp) -> Result<()> {
        let frame = Frame::new(FrameKind::ReduceF64, op, f64s_to_bits(values));
        let combined = self.collective(frame)?;
        bits_to_f64s(&combined, values);
        Ok(())
    }

    fn all_reduce_u64(&self, values: &mut [u64], op: ReduceOp) -> Result<()> {
        let frame = Frame::new(FrameKind::ReduceU64, op, values.to_vec());
        let combined = self.collective(frame)?;
        values.copy_from_slice(&combined);
        Ok(())
    }

    fn finalize(&self) -> Result<()> {
        self.collective(Frame::control(FrameKind::Finalize))?;
        self.links.lock().take();
        debug!(target: "serpar::comm", rank = self.rank(), "Process group finalized");
        Ok(())
    }

    fn topology(&self) -> ProcessTopology {
        self.topology
    }
}

impl std::fmt::Debug for TcpComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpComm")
            .field("topology", &self.topology)
            .field("open", &self.links.lock().is_some())
            .finish()
    }
}
