//! # Muster Transport
//!
//! The transport substrate the rendezvous protocol runs over: reliable,
//! blocking point-to-point send/receive plus group broadcast between
//! numbered peers. Messages on the same (sender, receiver, channel) lane
//! arrive in FIFO order; the protocol's size-then-payload framing depends
//! on that.
//!
//! [`SimGroup`] provides an in-process implementation backed by per-lane
//! mailboxes, used to run many simulated ranks inside one process for
//! tests and the harness.

#![forbid(unsafe_code)]

pub mod error;
pub mod sim;

pub use error::{TransportError, TransportResult};
pub use sim::{SimGroup, SimTransport};

use async_trait::async_trait;
use muster_core::Rank;

/// Logical channel separating independent message lanes between the same
/// pair of ranks. FIFO ordering holds per (sender, receiver, channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel(pub u16);

impl Channel {
    /// Lane reserved for [`Transport::broadcast`]; point-to-point traffic
    /// must not use it.
    pub const BROADCAST: Channel = Channel(u16::MAX);
}

/// Core transport interface for all transport implementations.
///
/// Every operation is blocking in the collective sense: the future
/// resolves only once the exchange has completed, with no timeout and no
/// cancellation. Delivery is assumed reliable and ordered per lane.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bring the transport up. Called once, before any exchange.
    async fn init(&self) -> TransportResult<()>;

    /// Tear the transport down. No exchange may follow.
    async fn finalize(&self) -> TransportResult<()>;

    /// Number of ranks in the group.
    fn group_size(&self) -> usize;

    /// This endpoint's own rank.
    fn self_rank(&self) -> Rank;

    /// Deliver `bytes` to `destination` on `channel`.
    async fn send(&self, bytes: Vec<u8>, destination: Rank, channel: Channel)
        -> TransportResult<()>;

    /// Block until a message from `source` arrives on `channel`.
    async fn receive(&self, source: Rank, channel: Channel) -> TransportResult<Vec<u8>>;

    /// Group broadcast rooted at `root`. The root passes the payload and
    /// gets it back; every other rank passes anything (conventionally an
    /// empty buffer) and receives the root's payload.
    async fn broadcast(&self, bytes: Vec<u8>, root: Rank) -> TransportResult<Vec<u8>>;
}
