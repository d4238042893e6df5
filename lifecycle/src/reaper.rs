//! Background removal of DNS validation records.
//!
//! A validation record stays published until the CA reports its certificate
//! as issued or revoked, since the CA may retry validation until then. Each
//! sweep walks the ledger once, in order, and removes what it can. A failure
//! on one entry is logged and the entry is kept for the next sweep.

use std::{sync::Arc, time::Duration};

use certkeeper_cloud::{CertificateAuthority, DeleteOutcome, TxtRecord};
use certkeeper_db::{
    models::DbValidationRecord,
    storage::{Storage, StoreError, ValidationRecordStore},
};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{manager::CertificateManager, providers::DnsProviders};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReaperError {
    #[error("reaper is already running")]
    AlreadyRunning,
    #[error("reaper has been stopped")]
    Stopped,
}

/// Counts from one pass over the ledger.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub removed: usize,
    /// Kept because the CA may still validate against them.
    pub pending: usize,
    /// Kept because a step failed; retried next sweep.
    pub failed: usize,
}

enum Outcome {
    Removed,
    Pending,
    Failed,
}

#[derive(Debug)]
struct Sweeper {
    storage: Arc<dyn Storage>,
    ca: Arc<dyn CertificateAuthority>,
    providers: DnsProviders,
}

impl Sweeper {
    async fn sweep(&self) -> Result<SweepReport, StoreError> {
        let records = ValidationRecordStore::list(&*self.storage).await?;
        let mut report = SweepReport {
            examined: records.len(),
            ..Default::default()
        };

        for record in &records {
            match self.reap(record).await {
                Outcome::Removed => report.removed += 1,
                Outcome::Pending => report.pending += 1,
                Outcome::Failed => report.failed += 1,
            }
        }

        Ok(report)
    }

    async fn reap(&self, record: &DbValidationRecord) -> Outcome {
        if let Some(certificate_id) = &record.certificate_id {
            match self.ca.describe(certificate_id).await {
                Ok(detail) if !detail.status.is_terminal() => {
                    debug!(%record, status = %detail.status, "certificate still validating");
                    return Outcome::Pending;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(%record, error = %e, "could not check certificate status");
                    return Outcome::Failed;
                }
            }
        }

        let provider = match self.providers.resolve(&record.dns_provider) {
            Ok(provider) => provider,
            Err(e) => {
                warn!(%record, error = %e, "no provider for validation record");
                return Outcome::Failed;
            }
        };

        let txt = TxtRecord {
            domain: &record.domain,
            name: &record.key,
            value: &record.value,
        };
        match provider.delete_validation_record(txt).await {
            Ok(DeleteOutcome::Deleted) => debug!(%record, "deleted validation record"),
            Ok(DeleteOutcome::NotFound) => debug!(%record, "validation record already gone"),
            Err(e) => {
                warn!(%record, error = %e, "could not delete validation record");
                return Outcome::Failed;
            }
        }

        match ValidationRecordStore::delete(&*self.storage, &record.id).await {
            Ok(_) => Outcome::Removed,
            Err(e) => {
                warn!(%record, error = %e, "could not drop ledger entry");
                Outcome::Failed
            }
        }
    }
}

enum ReaperState {
    Idle,
    Running {
        shutdown: CancellationToken,
        handle: JoinHandle<()>,
    },
    Stopped,
}

/// Owns the periodic sweep task.
///
/// `start` spawns the task, which sweeps once right away and then on every
/// tick. `stop` cancels it, waits for an in-flight sweep to finish, and
/// leaves the reaper stopped for good.
pub struct ValidationRecordReaper {
    sweeper: Arc<Sweeper>,
    interval: Duration,
    state: Mutex<ReaperState>,
}

impl ValidationRecordReaper {
    pub fn new(
        storage: Arc<dyn Storage>,
        ca: Arc<dyn CertificateAuthority>,
        providers: DnsProviders,
        interval: Duration,
    ) -> Self {
        Self {
            sweeper: Arc::new(Sweeper {
                storage,
                ca,
                providers,
            }),
            interval: interval.max(MIN_INTERVAL),
            state: Mutex::new(ReaperState::Idle),
        }
    }

    /// Shares the manager's storage, CA and providers. `None` without a CA.
    pub fn for_manager(manager: &CertificateManager, interval: Duration) -> Option<Self> {
        let ca = manager.ca()?.clone();
        Some(Self::new(
            manager.storage().clone(),
            ca,
            manager.dns_providers().clone(),
            interval,
        ))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), ReaperState::Running { .. })
    }

    /// One pass over the ledger, outside the periodic task.
    pub async fn sweep(&self) -> Result<SweepReport, StoreError> {
        self.sweeper.sweep().await
    }

    pub fn start(&self) -> Result<(), ReaperError> {
        let mut state = self.state.lock();
        match *state {
            ReaperState::Idle => {}
            ReaperState::Running { .. } => return Err(ReaperError::AlreadyRunning),
            ReaperState::Stopped => return Err(ReaperError::Stopped),
        }

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(run(
            self.sweeper.clone(),
            self.interval,
            shutdown.clone(),
        ));
        info!(interval_secs = self.interval.as_secs(), "validation record reaper started");

        *state = ReaperState::Running { shutdown, handle };
        Ok(())
    }

    /// Stops the task and waits for it. Calling it again is a no-op.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), ReaperState::Stopped);
        if let ReaperState::Running { shutdown, handle } = previous {
            shutdown.cancel();
            if let Err(e) = handle.await {
                error!(error = %e, "validation record reaper task failed");
            }
        }
    }
}

async fn run(sweeper: Arc<Sweeper>, period: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => match sweeper.sweep().await {
                Ok(report) if report.examined > 0 => info!(
                    examined = report.examined,
                    removed = report.removed,
                    pending = report.pending,
                    failed = report.failed,
                    "validation record sweep finished"
                ),
                Ok(_) => debug!("no validation records outstanding"),
                Err(e) => error!(error = %e, "could not read validation records"),
            },
        }
    }

    info!("validation record reaper stopped");
}
