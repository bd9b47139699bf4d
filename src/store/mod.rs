//! Shared store capability
//!
//! The tracker never talks to a concrete backend. Everything it needs from the
//! outside world is expressed by the [`SharedStore`] trait:
//!
//! - **Maps**: atomic put-if-absent keyed by string (coordinator election)
//! - **Counters**: initialize-once, decrement, read, bounded wait-for-zero
//! - **Sequences**: concurrent append and full snapshot read (result records)
//!
//! # Implementations
//!
//! - `memory`: in-process store, used by tests, local runs and the service
//! - `remote`: blocking TCP client talking to a `service::StoreService`
//!
//! All atomicity lives in the implementation. Callers never lock anything.

pub mod memory;
pub mod protocol;
pub mod remote;
pub mod service;

pub use memory::InMemoryStore;
pub use remote::RemoteStore;
pub use service::StoreService;

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a shared store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Counter was used before anyone initialized it
    #[error("counter '{0}' has not been initialized")]
    UnknownCounter(String),

    /// A blocking wait was woken before its condition or timeout
    #[error("wait interrupted")]
    Interrupted,

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Frame or record could not be encoded/decoded
    #[error("codec error: {0}")]
    Codec(String),

    /// The store service reported a failure
    #[error("store service error: {0}")]
    Remote(String),

    #[error("protocol version mismatch: local={local}, remote={remote}")]
    ProtocolMismatch { local: u32, remote: u32 },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Atomic primitives shared by every participant of a run
///
/// Implementations must make each method linearizable with respect to every
/// other call on the same name, from any thread or process.
pub trait SharedStore: Send + Sync {
    /// Insert `value` under `key` in `map` unless the key is already present
    ///
    /// Returns `true` only to the caller whose value was inserted.
    fn put_if_absent(&self, map: &str, key: &str, value: &[u8]) -> StoreResult<bool>;

    /// Create counter `name` with `count` unless it already exists
    ///
    /// Returns `false` (and leaves the existing value alone) when the counter
    /// was already initialized.
    fn try_init_counter(&self, name: &str, count: u64) -> StoreResult<bool>;

    /// Decrement counter `name` by one, returning the remaining count
    ///
    /// A counter already at zero stays at zero.
    fn count_down(&self, name: &str) -> StoreResult<u64>;

    /// Read the current value of counter `name`
    fn count(&self, name: &str) -> StoreResult<u64>;

    /// Block until counter `name` reaches zero or `timeout` elapses
    ///
    /// Returns `Ok(true)` if the counter read zero, `Ok(false)` on timeout.
    /// May return early with [`StoreError::Interrupted`]; callers re-check.
    fn await_zero(&self, name: &str, timeout: Duration) -> StoreResult<bool>;

    /// Append one item to sequence `list`
    fn append(&self, list: &str, item: Vec<u8>) -> StoreResult<()>;

    /// Read every item currently in sequence `list`
    ///
    /// A sequence nobody appended to reads as empty.
    fn snapshot(&self, list: &str) -> StoreResult<Vec<Vec<u8>>>;
}
