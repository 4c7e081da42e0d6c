//! JSON file ledger.
//!
//! Writes go to a sibling `.tmp` file which is then renamed over the
//! ledger, so a crash mid-write leaves the previous snapshot readable.
//! Writers serialize on a sibling `.lock` file, created exclusively and
//! removed when the store finishes; the revision check runs under it.

use super::{LedgerError, LedgerResult, LedgerSnapshot, PollLedger};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Attempts to take the writer lock before giving up.
const LOCK_ATTEMPTS: u32 = 50;
/// Pause between lock attempts.
const LOCK_RETRY: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    fn lock_path(&self) -> PathBuf {
        self.sibling(".lock")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger".into());
        name.push(suffix);
        self.path.with_file_name(name)
    }

    /// Revision of the snapshot on disk, 0 if there is none.
    async fn stored_revision(&self) -> LedgerResult<u64> {
        #[derive(Deserialize)]
        struct Head {
            #[serde(default)]
            revision: u64,
        }

        match fs::read(&self.path).await {
            Ok(contents) => Ok(serde_json::from_slice::<Head>(&contents)?.revision),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

/// Held while a store runs; dropping it releases the lock file.
struct WriterLock {
    path: PathBuf,
}

impl WriterLock {
    async fn acquire(path: PathBuf) -> LedgerResult<Self> {
        for _ in 0..LOCK_ATTEMPTS {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tokio::time::sleep(LOCK_RETRY).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(LedgerError::Locked(path))
    }
}

impl Drop for WriterLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(lock = %self.path.display(), error = %e, "failed to release ledger lock");
        }
    }
}

#[async_trait]
impl PollLedger for FileLedger {
    async fn load(&self) -> LedgerResult<Option<LedgerSnapshot>> {
        let contents = match fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_slice(&contents)?;
        Ok(Some(snapshot))
    }

    async fn store(&self, snapshot: &LedgerSnapshot) -> LedgerResult<u64> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let _lock = WriterLock::acquire(self.lock_path()).await?;

        let found = self.stored_revision().await?;
        if found != snapshot.revision {
            tracing::warn!(
                path = %self.path.display(),
                expected = snapshot.revision,
                found,
                "ledger changed underneath this writer"
            );
            return Err(LedgerError::Conflict {
                expected: snapshot.revision,
                found,
            });
        }

        let revision = found + 1;
        let contents = serde_json::to_vec_pretty(&LedgerSnapshot {
            revision,
            ..snapshot.clone()
        })?;

        let temp = self.temp_path();
        fs::write(&temp, contents).await?;
        fs::rename(&temp, &self.path).await?;

        tracing::debug!(
            path = %self.path.display(),
            polls = snapshot.polls.len(),
            revision,
            "ledger stored"
        );
        Ok(revision)
    }
}
