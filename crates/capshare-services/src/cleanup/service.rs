use crate::locks::PathLocks;
use capshare_core::ResolvedPath;
use capshare_db::{DbError, MetadataRepository};
use capshare_storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Counts from one reaper pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReapSummary {
    pub expired: usize,
    pub deleted: usize,
    pub skipped_busy: usize,
    pub failed: usize,
}

enum ReapOutcome {
    Deleted,
    Busy,
    /// Replaced by a newer upload or already removed since the scan.
    Stale,
}

/// Background task deleting expired files, blob and record together.
#[derive(Clone)]
pub struct ExpiryReaper {
    metadata: MetadataRepository,
    storage: Arc<dyn Storage>,
    locks: PathLocks,
    period: Duration,
}

impl ExpiryReaper {
    pub fn new(
        metadata: MetadataRepository,
        storage: Arc<dyn Storage>,
        locks: PathLocks,
        period: Duration,
    ) -> Self {
        Self {
            metadata,
            storage,
            locks,
            period,
        }
    }

    /// Start the background reaper loop
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let now = chrono::Utc::now().timestamp();
                match self.run_cycle(now).await {
                    Ok(summary) if summary.expired > 0 => {
                        tracing::info!(
                            expired = summary.expired,
                            deleted = summary.deleted,
                            skipped_busy = summary.skipped_busy,
                            failed = summary.failed,
                            "Expiry reaper cycle completed"
                        );
                    }
                    Ok(_) => tracing::debug!("Expiry reaper found nothing to delete"),
                    Err(e) => tracing::error!(error = %e, "Expiry reaper scan failed"),
                }
            }
        })
    }

    /// One pass over the metadata store.
    ///
    /// Only a failure to scan is returned; per-record failures are logged and
    /// counted, and the pass moves on to the next record.
    #[tracing::instrument(skip(self), fields(cleanup.operation = "expire_all"))]
    pub async fn run_cycle(&self, now: i64) -> Result<ReapSummary, DbError> {
        let expired = self.metadata.list_expired(now).await?;
        let mut summary = ReapSummary {
            expired: expired.len(),
            ..Default::default()
        };

        for (path, record) in expired {
            tracing::info!(
                key = %path,
                filename = %record.filename,
                expire = record.expire,
                "Deleting expired file"
            );

            match self.reap_one(&path, now).await {
                Ok(ReapOutcome::Deleted) => summary.deleted += 1,
                Ok(ReapOutcome::Busy) => {
                    tracing::debug!(key = %path, "Path busy, retrying next cycle");
                    summary.skipped_busy += 1;
                }
                Ok(ReapOutcome::Stale) => {}
                Err(e) => {
                    tracing::error!(error = %e, key = %path, "Failed to delete expired file");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn reap_one(&self, path: &ResolvedPath, now: i64) -> Result<ReapOutcome, anyhow::Error> {
        let Some(guard) = self.locks.try_exclusive(path) else {
            return Ok(ReapOutcome::Busy);
        };

        // an upload may have replaced the record between the scan and the lock
        match self.metadata.get(path).await? {
            Some(record) if record.is_expired_at(now) => {}
            _ => return Ok(ReapOutcome::Stale),
        }

        match self.storage.delete(path.as_str()).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(key = %path, "Blob already absent");
            }
            Err(e) => return Err(e.into()),
        }

        self.metadata.delete(path).await?;

        guard.release();
        Ok(ReapOutcome::Deleted)
    }
}
