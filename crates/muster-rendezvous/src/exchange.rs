//! Makes the committed store reducible over a transport.
//!
//! Each hop of the reduction is a two-frame exchange on its own pair of
//! lanes: a fixed-width size frame, then the packed store. A size of
//! zero means no payload frame follows. FIFO ordering per lane is what
//! keeps the two frames associated.

use async_trait::async_trait;
use muster_collective::Reducible;
use muster_core::{KvsStore, Rank, WireError};
use muster_transport::{Channel, Transport, TransportError};
use thiserror::Error;
use tracing::trace;

/// Lane carrying the size frame of a reduction hop.
pub const REDUCE_SIZE: Channel = Channel(14568);
/// Lane carrying the payload frame of a reduction hop.
pub const REDUCE_DATA: Channel = Channel(14569);

/// Errors raised while exchanging a store during the reduction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// Transport-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The received payload did not decode.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// The size frame was not a 4-byte integer.
    #[error("size frame was {got} bytes, expected 4")]
    BadSizeFrame {
        /// Bytes actually received.
        got: usize,
    },

    /// The payload length disagrees with the advertised size.
    #[error("payload was {got} bytes, {advertised} advertised")]
    Truncated {
        /// Length the size frame promised.
        advertised: usize,
        /// Length actually received.
        got: usize,
    },
}

/// Adapter lending a committed store to the reduction: `send` ships the
/// whole store, `receive` merges a peer's store in (overwriting on
/// duplicate keys).
pub struct KvsExchange<'a, T> {
    store: &'a mut KvsStore,
    transport: &'a T,
}

impl<'a, T: Transport> KvsExchange<'a, T> {
    /// Borrow `store` for one reduction pass over `transport`.
    pub fn new(store: &'a mut KvsStore, transport: &'a T) -> Self {
        Self { store, transport }
    }
}

#[async_trait]
impl<T: Transport> Reducible for KvsExchange<'_, T> {
    type Error = ExchangeError;

    async fn send(&mut self, destination: Rank) -> Result<(), ExchangeError> {
        let payload = self.store.to_wire();
        let size = payload.len() as u32;
        trace!(destination, size, "exchange send");
        self.transport
            .send(size.to_le_bytes().to_vec(), destination, REDUCE_SIZE)
            .await?;
        if payload.is_empty() {
            return Ok(());
        }
        self.transport
            .send(payload, destination, REDUCE_DATA)
            .await?;
        Ok(())
    }

    async fn receive(&mut self, source: Rank) -> Result<(), ExchangeError> {
        let frame = self.transport.receive(source, REDUCE_SIZE).await?;
        let advertised = <[u8; 4]>::try_from(frame.as_slice())
            .map(u32::from_le_bytes)
            .map_err(|_| ExchangeError::BadSizeFrame { got: frame.len() })?
            as usize;
        trace!(source, advertised, "exchange receive");
        if advertised == 0 {
            return Ok(());
        }
        let payload = self.transport.receive(source, REDUCE_DATA).await?;
        if payload.len() != advertised {
            return Err(ExchangeError::Truncated {
                advertised,
                got: payload.len(),
            });
        }
        self.store.unpack(&payload)?;
        Ok(())
    }
}
