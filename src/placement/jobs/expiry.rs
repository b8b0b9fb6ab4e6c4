//! Lazy expiry reconciliation and the periodic sweep that backs it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::domain::{Job, JobId, JobStatus};
use super::repository::{ExpiryWrite, JobQuery, PlacementStore, RepositoryError};

/// True when the deadline is strictly before `now` and the job has not expired yet.
pub fn is_past_deadline(job: &Job, now: DateTime<Utc>) -> bool {
    job.job_status != JobStatus::Expired && job.job_deadline < now
}

/// Counts of what a reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub applied: usize,
    pub superseded: usize,
    pub failed: usize,
}

impl ReconcileReport {
    pub fn attempted(&self) -> usize {
        self.applied + self.superseded + self.failed
    }
}

/// Flips every overdue job in `jobs` to `Expired` and persists the flips concurrently.
///
/// Each write is guarded by the version that was read, so a concurrent editor or a second
/// reconciler cannot be overwritten. A write that fails or loses the race does not undo the
/// others. A superseded record is re-read so callers see the newer revision. Callers always
/// get back jobs whose status reflects the deadline, persisted or not.
pub async fn reconcile<S>(store: &S, jobs: &mut [Job], now: DateTime<Utc>) -> ReconcileReport
where
    S: PlacementStore + ?Sized,
{
    let due: Vec<(usize, JobId, u64)> = jobs
        .iter()
        .enumerate()
        .filter(|(_, job)| is_past_deadline(job, now))
        .map(|(idx, job)| (idx, job.id.clone(), job.version))
        .collect();

    let mut report = ReconcileReport::default();
    if due.is_empty() {
        return report;
    }

    let outcomes = join_all(
        due.iter()
            .map(|(_, id, version)| store.expire_job(id, *version)),
    )
    .await;

    for ((idx, id, _), outcome) in due.into_iter().zip(outcomes) {
        match outcome {
            Ok(ExpiryWrite::Applied(stored)) => {
                report.applied += 1;
                jobs[idx] = stored;
            }
            Ok(ExpiryWrite::Superseded) => {
                report.superseded += 1;
                tracing::debug!(job_id = %id, "expiry write superseded by a newer revision");
                if let Ok(Some(current)) = store.fetch_job(&id).await {
                    jobs[idx] = current;
                }
                if is_past_deadline(&jobs[idx], now) {
                    jobs[idx].job_status = JobStatus::Expired;
                }
            }
            Err(err) => {
                report.failed += 1;
                tracing::warn!(job_id = %id, error = %err, "failed to persist job expiry");
                jobs[idx].job_status = JobStatus::Expired;
            }
        }
    }

    if report.applied > 0 {
        tracing::info!(
            expired = report.applied,
            superseded = report.superseded,
            failed = report.failed,
            "reconciled overdue jobs"
        );
    }
    report
}

/// Background task that expires overdue jobs even when nobody reads them.
pub struct ExpirySweeper<S> {
    store: Arc<S>,
    period: Duration,
}

impl<S> ExpirySweeper<S>
where
    S: PlacementStore + 'static,
{
    pub fn new(store: Arc<S>, period: Duration) -> Self {
        Self { store, period }
    }

    /// Run a single sweep (for tests or manual invocation).
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<ReconcileReport, RepositoryError> {
        let mut overdue = self.store.find_jobs(&JobQuery::overdue(now)).await?;
        Ok(reconcile(self.store.as_ref(), &mut overdue, now).await)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(&self) {
        tracing::info!(period = ?self.period, "starting expiry sweeper");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.sweep_once(Utc::now()).await {
                Ok(report) if report.attempted() > 0 => {
                    tracing::info!(
                        expired = report.applied,
                        superseded = report.superseded,
                        failed = report.failed,
                        "expiry sweep complete"
                    );
                }
                Ok(_) => {}
                Err(err) => tracing::error!(error = %err, "expiry sweep failed"),
            }
        }
    }
}
