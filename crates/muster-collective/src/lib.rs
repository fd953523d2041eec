//! # Muster Collective
//!
//! A generic binomial-tree reduction, adapted from the classic MPICH
//! algorithm. The reduction itself is agnostic to what is being reduced:
//! any object exposing [`Reducible::send`] and [`Reducible::receive`] can
//! participate, and the merge happens inside those two calls.
//!
//! For a group of `size` ranks the tree completes in `log2(size)` rounds;
//! after [`reduce`] returns on every rank, the root has received a merge
//! contribution from every other rank, directly or transitively.

#![forbid(unsafe_code)]

use async_trait::async_trait;
use muster_core::Rank;
use tracing::trace;

/// Capability required of an object taking part in a reduction.
///
/// `send` transmits the object's current state to a peer; `receive`
/// accepts a peer's state and merges it in. Both block until the exchange
/// completes.
#[async_trait]
pub trait Reducible {
    /// Error produced by a failed exchange.
    type Error;

    /// Serialize and transmit the current state to `destination`.
    async fn send(&mut self, destination: Rank) -> Result<(), Self::Error>;

    /// Receive a peer's state from `source` and merge it in.
    async fn receive(&mut self, source: Rank) -> Result<(), Self::Error>;
}

/// Run one binomial-tree reduction pass rooted at `root`.
///
/// `rank` is this process's rank and `size` the group size; every rank in
/// the group must call this with the same `root` and `size`. Peer ranks
/// are computed relative to the root (`relrank = (rank - root) mod size`)
/// so any rank may serve as root.
///
/// A rank's participation ends immediately after its first `send`: at
/// that point it has handed its state to its parent and become a leaf.
/// Scanning further mask bits after sending would wait on receives no
/// peer ever issues.
///
/// Returns the first `send`/`receive` error, abandoning the walk.
pub async fn reduce<R>(root: Rank, rank: Rank, size: usize, object: &mut R) -> Result<(), R::Error>
where
    R: Reducible + Send,
{
    if size <= 1 {
        return Ok(());
    }

    let relrank = (rank + size - root) % size;
    let mut mask = 1;
    while mask < size {
        if mask & relrank == 0 {
            let source = relrank | mask;
            if source < size {
                let source = (source + root) % size;
                trace!(rank, source, mask, "reduction receive");
                object.receive(source).await?;
            }
        } else {
            let destination = ((relrank & !mask) + root) % size;
            trace!(rank, destination, mask, "reduction send");
            object.send(destination).await?;
            // Leaf from here on.
            break;
        }
        mask <<= 1;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Send(Rank),
        Receive(Rank),
    }

    #[derive(Debug, thiserror::Error)]
    #[error("injected exchange failure")]
    struct InjectedFailure;

    /// Records the exchange sequence instead of moving any data.
    #[derive(Default)]
    struct Trace {
        events: Vec<Event>,
        fail_on_receive: bool,
    }

    #[async_trait]
    impl Reducible for Trace {
        type Error = InjectedFailure;

        async fn send(&mut self, destination: Rank) -> Result<(), InjectedFailure> {
            self.events.push(Event::Send(destination));
            Ok(())
        }

        async fn receive(&mut self, source: Rank) -> Result<(), InjectedFailure> {
            if self.fail_on_receive {
                return Err(InjectedFailure);
            }
            self.events.push(Event::Receive(source));
            Ok(())
        }
    }

    async fn trace_of(root: Rank, rank: Rank, size: usize) -> Vec<Event> {
        let mut trace = Trace::default();
        reduce(root, rank, size, &mut trace).await.unwrap();
        trace.events
    }

    #[tokio::test]
    async fn size_one_exchanges_nothing() {
        assert!(trace_of(0, 0, 1).await.is_empty());
    }

    #[tokio::test]
    async fn size_two_is_one_exchange() {
        assert_eq!(trace_of(0, 0, 2).await, [Event::Receive(1)]);
        assert_eq!(trace_of(0, 1, 2).await, [Event::Send(0)]);
    }

    #[tokio::test]
    async fn size_four_tree_shape() {
        assert_eq!(
            trace_of(0, 0, 4).await,
            [Event::Receive(1), Event::Receive(2)]
        );
        assert_eq!(trace_of(0, 1, 4).await, [Event::Send(0)]);
        assert_eq!(trace_of(0, 2, 4).await, [Event::Receive(3), Event::Send(0)]);
        assert_eq!(trace_of(0, 3, 4).await, [Event::Send(2)]);
    }

    /// An odd rank's first mask bit is set, so it sends in round one and
    /// must not keep walking the tree afterwards.
    #[tokio::test]
    async fn rank_stops_after_first_send() {
        assert_eq!(trace_of(0, 1, 8).await, [Event::Send(0)]);
        assert_eq!(trace_of(0, 5, 8).await, [Event::Send(4)]);
    }

    #[tokio::test]
    async fn root_receives_one_peer_per_round() {
        assert_eq!(
            trace_of(0, 0, 8).await,
            [Event::Receive(1), Event::Receive(2), Event::Receive(4)]
        );
    }

    #[tokio::test]
    async fn partial_last_round_skips_missing_peer() {
        // size 6: root's mask-4 partner would be relrank 4, which exists,
        // but rank 2's mask-4 partner (relrank 6) does not.
        assert_eq!(
            trace_of(0, 0, 6).await,
            [Event::Receive(1), Event::Receive(2), Event::Receive(4)]
        );
        assert_eq!(trace_of(0, 2, 6).await, [Event::Receive(3), Event::Send(0)]);
    }

    #[tokio::test]
    async fn nonzero_root_translates_peer_ranks() {
        // root 2, size 4: relranks are rank-2 mod 4.
        assert_eq!(
            trace_of(2, 2, 4).await,
            [Event::Receive(3), Event::Receive(0)]
        );
        assert_eq!(trace_of(2, 3, 4).await, [Event::Send(2)]);
        assert_eq!(trace_of(2, 0, 4).await, [Event::Receive(1), Event::Send(2)]);
        assert_eq!(trace_of(2, 1, 4).await, [Event::Send(0)]);
    }

    #[tokio::test]
    async fn first_failure_aborts_the_walk() {
        let mut trace = Trace {
            fail_on_receive: true,
            ..Trace::default()
        };

        assert!(reduce(0, 0, 4, &mut trace).await.is_err());
        assert!(trace.events.is_empty());
    }
}
