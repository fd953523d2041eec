//! Transport errors.

use crate::Channel;
use muster_core::Rank;
use thiserror::Error;

/// Errors surfaced by transport operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The named rank is outside the group.
    #[error("rank {rank} is outside the group of size {size}")]
    InvalidRank {
        /// Offending rank.
        rank: Rank,
        /// Group size.
        size: usize,
    },

    /// The peer's end of a lane has gone away.
    #[error("lane to rank {rank} on channel {channel:?} is closed")]
    LaneClosed {
        /// Peer rank.
        rank: Rank,
        /// Lane channel.
        channel: Channel,
    },

    /// Point-to-point traffic attempted on the reserved broadcast lane.
    #[error("channel {channel:?} is reserved for broadcast")]
    ReservedChannel {
        /// Offending channel.
        channel: Channel,
    },
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
