//! Error taxonomy for the storage-and-transaction core (spec.md §7).

use std::io;

use thiserror::Error;

/// The single error type returned across every component boundary. All
/// errors are propagated to the `Transaction` boundary; nothing is
/// swallowed, and nothing auto-rolls-back on the caller's behalf.
#[derive(Debug, Error)]
pub enum DbError {
    /// A disk read/write/seek/append failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A page offset was beyond the block size, a slot was out of range, or
    /// a field name was unknown to the layout.
    #[error("bounds violation: {0}")]
    Bounds(String),

    /// A lock wait exceeded the configured timeout. The caller must roll
    /// back the owning transaction.
    #[error("lock wait aborted on {0}")]
    LockAbort(String),

    /// A buffer pin exceeded the configured timeout. Same policy as
    /// `LockAbort`.
    #[error("pin timed out waiting for a free buffer")]
    PinTimeout,

    /// An unknown field name or type was requested from a `Layout`/`Schema`.
    #[error("schema error: {0}")]
    Schema(String),

    /// Recovery encountered a log that violates its own invariants (e.g. a
    /// SETINT record with no preceding START). This is fatal: it indicates
    /// on-disk corruption, not a programmer error the caller can retry.
    #[error("corrupt log or recovery state: {0}")]
    Corrupt(String),

    /// `get*`/`set*` was called on a block the transaction never pinned.
    #[error("block not pinned by this transaction: {0}")]
    BufferNotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Logs this error together with a captured backtrace, for the lock-
    /// and pin-timeout variants where the *caller* of the timed-out call is
    /// rarely the interesting site — the wait started several frames up.
    /// Mirrors the teacher's own `err.show_backtrace()` call at its lock
    /// and deadlock timeout sites.
    pub fn log_backtrace(&self) {
        log::error!("{}\n{:?}", self, backtrace::Backtrace::new());
    }
}
