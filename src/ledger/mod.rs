//! Ledger boundary: durable storage for poll records.
//!
//! The manager is the authority while a process runs; a ledger holds the
//! records between runs. Implementations store whole snapshots, so a load
//! always sees a state the manager produced.
//!
//! Every stored snapshot carries a revision. A store names the revision it
//! was loaded from and fails with `Conflict` if another writer got there
//! first, so two processes sharing a ledger never overwrite each other's
//! votes.

pub mod file;
pub mod mock;

use crate::poll::Poll;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use file::FileLedger;
pub use mock::MemoryLedger;

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger errors
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt ledger: {0}")]
    Corrupt(String),

    #[error("Ledger changed since it was loaded (expected revision {expected}, found {found}); retry the command")]
    Conflict { expected: u64, found: u64 },

    #[error("Ledger is locked by another writer ({}); remove the lock file if no other process is running", .0.display())]
    Locked(PathBuf),
}

/// Every poll record plus the id counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Number of stores that produced this snapshot; 0 for a fresh ledger.
    #[serde(default)]
    pub revision: u64,
    pub next_poll_id: u64,
    pub polls: Vec<Poll>,
}

/// Durable poll storage.
#[async_trait]
pub trait PollLedger: Send + Sync {
    /// Load the last stored snapshot, or `None` for a ledger never written.
    async fn load(&self) -> LedgerResult<Option<LedgerSnapshot>>;

    /// Replace the stored snapshot and return its new revision.
    ///
    /// `snapshot.revision` must equal the revision currently stored (0 if
    /// nothing is); otherwise nothing is written and `Conflict` is
    /// returned. Either the new snapshot is stored in full or the previous
    /// one stays in place.
    async fn store(&self, snapshot: &LedgerSnapshot) -> LedgerResult<u64>;
}
