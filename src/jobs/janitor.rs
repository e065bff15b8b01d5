use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use uuid::Uuid;

use super::job::JobStatus;
use super::store::{JobStore, StoreError};

/// Reconciliation sweep for jobs orphaned in `processing`.
///
/// A crashed process leaves its in-flight jobs stuck in `processing`
/// forever — there is no resume. The janitor periodically marks jobs whose
/// last update is older than a grace period as `failed`, so pollers are
/// not left watching a job that will never finish.
///
/// ```ignore
/// Janitor::new(jobs.clone())
///     .grace_period(Duration::from_secs(30 * 60))
///     .sweep_interval(Duration::from_secs(120))
///     .start();
/// ```
pub struct Janitor {
    jobs: Arc<dyn JobStore>,
    grace_period: Duration,
    sweep_interval: Duration,
}

impl Janitor {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self {
            jobs,
            grace_period: Duration::from_secs(15 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }

    /// How long a job may sit in `processing` without an update before it
    /// counts as orphaned (default: 15 minutes). Must comfortably exceed
    /// the pacing interval, or live jobs get swept mid-run.
    pub fn grace_period(mut self, d: Duration) -> Self {
        self.grace_period = d;
        self
    }

    /// How often to sweep (default: 60 seconds).
    pub fn sweep_interval(mut self, d: Duration) -> Self {
        self.sweep_interval = d;
        self
    }

    /// Start the sweep loop. Spawns a background tokio task and returns
    /// immediately.
    pub fn start(self) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.sweep_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match self.sweep().await {
                    Ok(0) => {}
                    Ok(swept) => tracing::info!(swept, "janitor failed stale processing jobs"),
                    Err(e) => tracing::error!(error = %e, "janitor sweep failed"),
                }
            }
        });

        tracing::info!("Janitor running");
    }

    /// One sweep pass; returns how many jobs were marked failed.
    pub async fn sweep(&self) -> Result<usize, StoreError> {
        let cutoff = OffsetDateTime::now_utc() - self.grace_period;
        let stale: Vec<Uuid> = self.jobs.stale_processing(cutoff).await?;

        for job_id in &stale {
            tracing::warn!(%job_id, "job stuck in processing, marking failed");
            self.jobs.set_status(*job_id, JobStatus::Failed).await?;
        }

        Ok(stale.len())
    }
}
