//! # Muster Core
//!
//! Shared foundation for the muster rendezvous protocol: the ordered
//! key/value store each process holds, the flat wire codec used to ship a
//! store between processes, and the limits every layer validates against.
//!
//! The wire format is deliberately minimal: an alternating sequence of
//! NUL-terminated key/value strings with no per-entry framing. The total
//! byte length of the buffer is the only framing mechanism, and it always
//! travels ahead of the payload as a separate fixed-width frame.

#![forbid(unsafe_code)]

pub mod limits;
pub mod store;
pub mod wire;

pub use limits::Limits;
pub use store::KvsStore;
pub use wire::{WireCursor, WireError, WireResult};

/// Process rank within a group, `0..size`.
pub type Rank = usize;
