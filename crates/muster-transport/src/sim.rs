//! In-process simulated transport.
//!
//! A [`SimGroup`] wires up `size` endpoints sharing one mailbox router.
//! Each (sender, receiver, channel) lane is an unbounded mpsc queue
//! created on first use, so FIFO ordering per lane falls out of the queue
//! itself. Endpoints are handed to separate tasks, one per simulated
//! rank, which is how the multi-"process" barrier tests and the harness
//! drive the protocol inside a single OS process.

use crate::{Channel, Transport, TransportError, TransportResult};
use async_trait::async_trait;
use muster_core::Rank;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tracing::trace;

type LaneKey = (Rank, Rank, Channel);

/// Both ends of one mailbox lane.
#[derive(Clone)]
struct Lane {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

/// Shared mailbox router; lanes are created lazily.
#[derive(Default)]
struct Router {
    lanes: StdMutex<HashMap<LaneKey, Lane>>,
}

impl Router {
    /// Get or create the lane for `key`. The std mutex is held only for
    /// the map access, never across an await point.
    fn lane(&self, key: LaneKey) -> Lane {
        let mut lanes = self.lanes.lock().unwrap_or_else(|e| e.into_inner());
        lanes
            .entry(key)
            .or_insert_with(|| {
                let (tx, rx) = mpsc::unbounded_channel();
                Lane {
                    tx,
                    rx: Arc::new(Mutex::new(rx)),
                }
            })
            .clone()
    }
}

/// A group of connected in-process endpoints.
pub struct SimGroup;

impl SimGroup {
    /// Build `size` endpoints sharing one router, one per rank.
    pub fn new(size: usize) -> Vec<SimTransport> {
        let router = Arc::new(Router::default());
        (0..size)
            .map(|rank| SimTransport {
                rank,
                size,
                router: Arc::clone(&router),
            })
            .collect()
    }
}

/// One simulated rank's endpoint.
#[derive(Clone)]
pub struct SimTransport {
    rank: Rank,
    size: usize,
    router: Arc<Router>,
}

impl SimTransport {
    fn check_peer(&self, rank: Rank) -> TransportResult<()> {
        if rank >= self.size {
            return Err(TransportError::InvalidRank {
                rank,
                size: self.size,
            });
        }
        Ok(())
    }

    async fn push(&self, to: Rank, channel: Channel, bytes: Vec<u8>) -> TransportResult<()> {
        let lane = self.router.lane((self.rank, to, channel));
        lane.tx
            .send(bytes)
            .map_err(|_| TransportError::LaneClosed { rank: to, channel })
    }

    async fn pull(&self, from: Rank, channel: Channel) -> TransportResult<Vec<u8>> {
        let lane = self.router.lane((from, self.rank, channel));
        let mut rx = lane.rx.lock().await;
        rx.recv().await.ok_or(TransportError::LaneClosed {
            rank: from,
            channel,
        })
    }
}

#[async_trait]
impl Transport for SimTransport {
    async fn init(&self) -> TransportResult<()> {
        Ok(())
    }

    async fn finalize(&self) -> TransportResult<()> {
        Ok(())
    }

    fn group_size(&self) -> usize {
        self.size
    }

    fn self_rank(&self) -> Rank {
        self.rank
    }

    async fn send(
        &self,
        bytes: Vec<u8>,
        destination: Rank,
        channel: Channel,
    ) -> TransportResult<()> {
        if channel == Channel::BROADCAST {
            return Err(TransportError::ReservedChannel { channel });
        }
        self.check_peer(destination)?;
        trace!(
            from = self.rank,
            to = destination,
            ?channel,
            len = bytes.len(),
            "sim send"
        );
        self.push(destination, channel, bytes).await
    }

    async fn receive(&self, source: Rank, channel: Channel) -> TransportResult<Vec<u8>> {
        if channel == Channel::BROADCAST {
            return Err(TransportError::ReservedChannel { channel });
        }
        self.check_peer(source)?;
        let bytes = self.pull(source, channel).await?;
        trace!(
            from = source,
            to = self.rank,
            ?channel,
            len = bytes.len(),
            "sim receive"
        );
        Ok(bytes)
    }

    async fn broadcast(&self, bytes: Vec<u8>, root: Rank) -> TransportResult<Vec<u8>> {
        self.check_peer(root)?;
        if self.rank == root {
            for peer in (0..self.size).filter(|&p| p != root) {
                self.push(peer, Channel::BROADCAST, bytes.clone()).await?;
            }
            trace!(root, len = bytes.len(), "sim broadcast out");
            Ok(bytes)
        } else {
            let bytes = self.pull(root, Channel::BROADCAST).await?;
            trace!(root, rank = self.rank, len = bytes.len(), "sim broadcast in");
            Ok(bytes)
        }
    }
}
