//! Rendezvous service errors.

use thiserror::Error;

/// Errors returned by [`RendezvousService`](crate::RendezvousService)
/// operations.
///
/// Validation failures are detected before any mutation: a rejected
/// `put`, `commit`, or `get` leaves both stores unchanged. `barrier`
/// deliberately collapses its whole failure surface (transport faults,
/// malformed payloads, calls before init) into [`Fail`](Self::Fail);
/// callers of the collective get exactly two outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RendezvousError {
    /// Operation requires an initialized context.
    #[error("not initialized")]
    NotInitialized,

    /// Caller misuse, such as initializing twice before finalizing.
    #[error("invalid argument: {0}")]
    InvalidArg(&'static str),

    /// The caller's buffer capacity is too small; `required` is the
    /// exact capacity the value needs, terminator included.
    #[error("buffer too small: {required} bytes required")]
    LengthExceeded {
        /// Exact capacity required.
        required: usize,
    },

    /// Namespace is overlong or does not name this process's space.
    #[error("namespace does not match this process's key/value space")]
    InvalidNamespace,

    /// Key is overlong or contains the wire separator byte.
    #[error("invalid key")]
    InvalidKey,

    /// Value is overlong or contains the wire separator byte.
    #[error("invalid value")]
    InvalidValue,

    /// No committed entry under this key.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The namespace name does not fit within the configured limit.
    #[error("out of memory for namespace name")]
    OutOfMemory,

    /// The operation is permanently unimplemented.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Generic failure; the only error the collective paths return.
    #[error("operation failed")]
    Fail,
}

/// Result alias for rendezvous operations.
pub type RendezvousResult<T> = Result<T, RendezvousError>;
