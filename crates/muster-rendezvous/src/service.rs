//! The rendezvous state machine.

use crate::error::{RendezvousError, RendezvousResult};
use crate::exchange::KvsExchange;
use muster_core::{KvsStore, Limits, Rank};
use muster_transport::Transport;
use tracing::{debug, error, warn};

/// Rank at which the barrier's reduction converges before broadcast.
const BARRIER_ROOT: Rank = 0;

/// Per-process context captured by `init` and destroyed by `finalize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessContext {
    /// This process's rank, `0..size`.
    pub rank: Rank,
    /// Number of processes in the job.
    pub size: usize,
    /// Application number within the job; always 0 without spawn support.
    pub app_number: u32,
    /// Name of this job's key/value space.
    pub kvs_name: String,
}

/// Explicit lifecycle: the service moves forward only, and `Finalized`
/// is terminal.
#[derive(Debug)]
enum Phase {
    Uninitialized,
    Initialized(ProcessContext),
    Finalized,
}

/// The rendezvous service: a staging store, a committed store, and the
/// collective machinery that merges committed stores globally.
///
/// One instance per process; all calls are made sequentially by the
/// owning process, so no internal locking exists. `barrier` is a
/// blocking collective: every process in the group must eventually call
/// it, and there is no timeout. A process that never calls `barrier`
/// blocks its peers indefinitely; that liveness obligation sits with the
/// caller.
pub struct RendezvousService<T> {
    transport: T,
    limits: Limits,
    phase: Phase,
    staging: KvsStore,
    committed: KvsStore,
}

impl<T: Transport> RendezvousService<T> {
    /// Create a service over `transport` with default limits.
    pub fn new(transport: T) -> Self {
        Self::with_limits(transport, Limits::default())
    }

    /// Create a service over `transport` with explicit limits.
    pub fn with_limits(transport: T, limits: Limits) -> Self {
        Self {
            transport,
            limits,
            phase: Phase::Uninitialized,
            staging: KvsStore::new(),
            committed: KvsStore::new(),
        }
    }

    fn context(&self) -> RendezvousResult<&ProcessContext> {
        match &self.phase {
            Phase::Initialized(ctx) => Ok(ctx),
            _ => Err(RendezvousError::NotInitialized),
        }
    }

    /// Namespace validation shared by the kvs operations: the name must
    /// fit the limit and name this process's own space.
    fn check_namespace(&self, kvsname: &str) -> RendezvousResult<()> {
        let ctx = self.context()?;
        if !self.limits.name_fits(kvsname) || kvsname != ctx.kvs_name {
            debug!(kvsname, "namespace rejected");
            return Err(RendezvousError::InvalidNamespace);
        }
        Ok(())
    }

    /// Bind to the transport, capture rank and size, and assign the
    /// namespace name. Returns the spawned flag, which is always `false`
    /// here: dynamic spawning is unsupported.
    ///
    /// Initializing twice before `finalize`, or after it, is invalid.
    pub async fn init(&mut self) -> RendezvousResult<bool> {
        match self.phase {
            Phase::Uninitialized => {}
            Phase::Initialized(_) => {
                return Err(RendezvousError::InvalidArg("already initialized"))
            }
            Phase::Finalized => return Err(RendezvousError::InvalidArg("already finalized")),
        }

        if let Err(error) = self.transport.init().await {
            warn!(%error, "transport init failed");
            return Err(RendezvousError::Fail);
        }
        let rank = self.transport.self_rank();
        let size = self.transport.group_size();

        let app_number = 0;
        let kvs_name = app_number.to_string();
        if !self.limits.name_fits(&kvs_name) {
            return Err(RendezvousError::OutOfMemory);
        }

        self.phase = Phase::Initialized(ProcessContext {
            rank,
            size,
            app_number,
            kvs_name,
        });
        debug!(rank, size, "init succeeded");
        Ok(false)
    }

    /// Whether the context is currently initialized. Callable in any
    /// phase.
    pub fn initialized(&self) -> bool {
        matches!(self.phase, Phase::Initialized(_))
    }

    /// Tear down the transport binding and clear both stores. The phase
    /// becomes terminal regardless of transport outcome; a transport
    /// failure is still reported.
    pub async fn finalize(&mut self) -> RendezvousResult<()> {
        let rc = self.transport.finalize().await;
        self.staging.clear();
        self.committed.clear();
        self.phase = Phase::Finalized;
        match rc {
            Ok(()) => {
                debug!("finalize succeeded");
                Ok(())
            }
            Err(error) => {
                warn!(%error, "transport finalize failed");
                Err(RendezvousError::Fail)
            }
        }
    }

    /// Number of processes in the job.
    pub fn size(&self) -> RendezvousResult<usize> {
        Ok(self.context()?.size)
    }

    /// This process's rank.
    pub fn rank(&self) -> RendezvousResult<Rank> {
        Ok(self.context()?.rank)
    }

    /// Size of the universe of processes; identical to [`size`](Self::size)
    /// without spawn support.
    pub fn universe_size(&self) -> RendezvousResult<usize> {
        Ok(self.context()?.size)
    }

    /// Application number of this process within the job.
    pub fn app_number(&self) -> RendezvousResult<u32> {
        Ok(self.context()?.app_number)
    }

    /// Name of this process's key/value space.
    pub fn kvs_my_name(&self) -> RendezvousResult<&str> {
        Ok(self.context()?.kvs_name.as_str())
    }

    /// "Create" a key/value space. Without spawn support there is only
    /// the static space, so this returns the same name as
    /// [`kvs_my_name`](Self::kvs_my_name).
    pub fn kvs_create(&self) -> RendezvousResult<&str> {
        self.kvs_my_name()
    }

    /// Maximum namespace-name length, terminator included.
    pub fn name_length_max(&self) -> RendezvousResult<usize> {
        self.context()?;
        Ok(self.limits.max_name_len)
    }

    /// Maximum key length, terminator included.
    pub fn key_length_max(&self) -> RendezvousResult<usize> {
        self.context()?;
        Ok(self.limits.max_key_len)
    }

    /// Maximum value length, terminator included.
    pub fn value_length_max(&self) -> RendezvousResult<usize> {
        self.context()?;
        Ok(self.limits.max_value_len)
    }

    /// Stage an entry for the next commit.
    ///
    /// Staging is insert-if-absent: when the same key is put twice
    /// before a commit, the first value wins. Validation happens before
    /// any mutation; a rejected put leaves both stores unchanged.
    pub fn put(&mut self, kvsname: &str, key: &str, value: &str) -> RendezvousResult<()> {
        self.check_namespace(kvsname)?;
        if !self.limits.key_fits(key) || key.as_bytes().contains(&0) {
            debug!(key, "put rejected: bad key");
            return Err(RendezvousError::InvalidKey);
        }
        if !self.limits.value_fits(value) || value.as_bytes().contains(&0) {
            debug!(key, "put rejected: bad value");
            return Err(RendezvousError::InvalidValue);
        }

        let inserted = self.staging.insert(key, value);
        debug!(key, inserted, "put staged");
        Ok(())
    }

    /// Move every staged entry into the committed store, overwriting
    /// committed entries for the keys it contains, then clear staging.
    /// Only this process's store is affected; nothing crosses processes
    /// until `barrier`.
    pub fn commit(&mut self, kvsname: &str) -> RendezvousResult<()> {
        self.check_namespace(kvsname)?;

        let staged = std::mem::take(&mut self.staging);
        let count = staged.len();
        for (key, value) in staged {
            self.committed.overwrite(key, value);
        }
        debug!(count, total = self.committed.len(), "commit applied");
        Ok(())
    }

    /// Synchronize with every process in the group and merge all
    /// committed stores into one globally consistent store.
    ///
    /// A binomial-tree reduction gathers every store at rank 0, merging
    /// with overwrite on duplicate keys as contributions arrive along
    /// the tree (deterministic for a fixed tree shape, but not a
    /// user-facing ordering guarantee). Rank 0 then broadcasts the
    /// merged size followed by the merged payload, and every other rank
    /// merges that in. On success all committed stores hold identical
    /// content.
    ///
    /// Blocks until every rank has participated; there is no timeout.
    /// Every failure, including calling before `init`, collapses to
    /// [`RendezvousError::Fail`]: the collective's contract is
    /// two-valued.
    pub async fn barrier(&mut self) -> RendezvousResult<()> {
        let ctx = match &self.phase {
            Phase::Initialized(ctx) => ctx,
            _ => {
                debug!("barrier refused: not initialized");
                return Err(RendezvousError::Fail);
            }
        };
        let (rank, size) = (ctx.rank, ctx.size);

        let mut exchange = KvsExchange::new(&mut self.committed, &self.transport);
        if let Err(error) = muster_collective::reduce(BARRIER_ROOT, rank, size, &mut exchange).await
        {
            warn!(rank, %error, "barrier reduction failed");
            return Err(RendezvousError::Fail);
        }

        // Two-phase broadcast on one lane: merged size first, then the
        // payload, so non-roots can trust the framing. The payload frame
        // goes out even when empty to keep the lane in step.
        let payload = if rank == BARRIER_ROOT {
            self.committed.to_wire()
        } else {
            Vec::new()
        };
        let size_frame = (payload.len() as u32).to_le_bytes().to_vec();
        let size_frame = match self.transport.broadcast(size_frame, BARRIER_ROOT).await {
            Ok(frame) => frame,
            Err(error) => {
                warn!(rank, %error, "barrier size broadcast failed");
                return Err(RendezvousError::Fail);
            }
        };
        let advertised = match <[u8; 4]>::try_from(size_frame.as_slice()) {
            Ok(bytes) => u32::from_le_bytes(bytes) as usize,
            Err(_) => {
                warn!(rank, got = size_frame.len(), "barrier size frame malformed");
                return Err(RendezvousError::Fail);
            }
        };
        let payload = match self.transport.broadcast(payload, BARRIER_ROOT).await {
            Ok(payload) => payload,
            Err(error) => {
                warn!(rank, %error, "barrier payload broadcast failed");
                return Err(RendezvousError::Fail);
            }
        };

        if rank != BARRIER_ROOT {
            if payload.len() != advertised {
                warn!(
                    rank,
                    advertised,
                    got = payload.len(),
                    "barrier payload truncated"
                );
                return Err(RendezvousError::Fail);
            }
            if let Err(error) = self.committed.unpack(&payload) {
                warn!(rank, %error, "barrier payload malformed");
                return Err(RendezvousError::Fail);
            }
        }

        debug!(rank, entries = self.committed.len(), "barrier complete");
        Ok(())
    }

    /// Look up `key` in the committed store.
    ///
    /// `capacity` models the caller's receive buffer: when it is smaller
    /// than the value's length plus its terminator, the call fails with
    /// the exact capacity required. Entries from other processes resolve
    /// only after a `barrier` has completed.
    pub fn get(&self, kvsname: &str, key: &str, capacity: usize) -> RendezvousResult<String> {
        self.check_namespace(kvsname)?;
        if !self.limits.key_fits(key) {
            return Err(RendezvousError::InvalidKey);
        }

        let value = self
            .committed
            .get(key)
            .ok_or_else(|| RendezvousError::KeyNotFound(key.to_owned()))?;

        let required = value.len() + 1;
        if capacity < required {
            debug!(key, capacity, required, "get rejected: short buffer");
            return Err(RendezvousError::LengthExceeded { required });
        }
        Ok(value.to_owned())
    }

    /// Finalize (best effort) and terminate the process with
    /// `exit_code`. A fatal, non-resumable control transfer, not an
    /// error return.
    pub async fn abort(&mut self, exit_code: i32, message: &str) -> ! {
        error!(exit_code, message, "abort requested");
        let _ = self.finalize().await;
        std::process::exit(exit_code);
    }

    /// Dynamic process spawning is explicitly unsupported.
    pub fn spawn_multiple(&self) -> RendezvousResult<()> {
        Err(RendezvousError::Unsupported("spawn_multiple"))
    }
}
