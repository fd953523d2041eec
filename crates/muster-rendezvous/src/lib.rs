//! # Muster Rendezvous
//!
//! The rendezvous service cooperating processes in a parallel job use to
//! exchange small key/value facts about themselves (addresses, ports,
//! ranks) and to synchronize before proceeding.
//!
//! Each process stages entries with [`RendezvousService::put`], makes
//! them locally visible with [`RendezvousService::commit`], and then
//! calls the collective [`RendezvousService::barrier`], which merges
//! every process's committed store into one globally consistent store:
//! a binomial-tree reduction gathers all stores at rank 0, and a
//! two-phase broadcast (size, then payload) pushes the merged result back
//! out. After the barrier, [`RendezvousService::get`] resolves any
//! process's entries.
//!
//! The surface mirrors the classic process-management interface: init /
//! finalize, rank and size accessors, a namespace-scoped key/value space,
//! and an always-failing `spawn_multiple` (dynamic spawning is
//! unsupported).

#![forbid(unsafe_code)]

pub mod error;
pub mod exchange;
pub mod service;

pub use error::{RendezvousError, RendezvousResult};
pub use service::{ProcessContext, RendezvousService};
