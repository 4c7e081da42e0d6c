//! In-memory ledger for testing.

use super::{LedgerError, LedgerResult, LedgerSnapshot, PollLedger};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

/// Ledger kept in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    stored: Arc<Mutex<Option<LedgerSnapshot>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of polls in the stored snapshot (for test assertions).
    pub fn stored_polls(&self) -> usize {
        self.stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |s| s.polls.len())
    }
}

#[async_trait]
impl PollLedger for MemoryLedger {
    async fn load(&self) -> LedgerResult<Option<LedgerSnapshot>> {
        Ok(self
            .stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn store(&self, snapshot: &LedgerSnapshot) -> LedgerResult<u64> {
        let mut stored = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
        let found = stored.as_ref().map_or(0, |s| s.revision);
        if found != snapshot.revision {
            return Err(LedgerError::Conflict {
                expected: snapshot.revision,
                found,
            });
        }
        let revision = found + 1;
        *stored = Some(LedgerSnapshot {
            revision,
            ..snapshot.clone()
        });
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_storage() {
        let ledger = MemoryLedger::new();
        let other = ledger.clone();
        assert!(ledger.load().await.unwrap().is_none());

        let revision = other
            .store(&LedgerSnapshot {
                next_poll_id: 3,
                ..LedgerSnapshot::default()
            })
            .await
            .unwrap();

        let loaded = ledger.load().await.unwrap().unwrap();
        assert_eq!(loaded.next_poll_id, 3);
        assert_eq!(loaded.revision, revision);
        assert_eq!(ledger.stored_polls(), 0);
    }

    #[tokio::test]
    async fn test_stale_revision_is_rejected() {
        let ledger = MemoryLedger::new();
        ledger.store(&LedgerSnapshot::default()).await.unwrap();

        let stale = LedgerSnapshot {
            next_poll_id: 9,
            ..LedgerSnapshot::default()
        };
        let err = ledger.store(&stale).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { expected: 0, found: 1 }));
        assert_eq!(ledger.load().await.unwrap().unwrap().next_poll_id, 0);
    }
}
