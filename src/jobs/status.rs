use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::job::{JobStatus, MailJob, MailLogEntry};
use super::store::{JobStore, StoreError};

/// Acknowledgement returned by job creation: the job runs in the
/// background, so the caller only learns the id and the batch size.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub job_id: Uuid,
    pub total_recipients: u32,
    pub status: JobStatus,
}

impl From<&MailJob> for JobAccepted {
    fn from(job: &MailJob) -> Self {
        Self {
            job_id: job.id,
            total_recipients: job.total,
            // The background task starts immediately after creation;
            // report the state the first poll will observe.
            status: JobStatus::Processing,
        }
    }
}

/// Point-in-time progress projection for polling clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgress {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub total_recipients: u32,
    pub sent_count: u32,
    pub failed_count: u32,
    pub progress_percent: u8,
}

impl From<&MailJob> for JobProgress {
    fn from(job: &MailJob) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            total_recipients: job.total,
            sent_count: job.sent,
            failed_count: job.failed,
            progress_percent: percent(job.sent + job.failed, job.total),
        }
    }
}

/// Attempted-over-total as a rounded percentage; 0 for an empty total.
fn percent(attempted: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    ((f64::from(attempted) / f64::from(total)) * 100.0).round() as u8
}

/// One page of delivery history, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub entries: Vec<MailLogEntry>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

/// Read-only projection over job counters and the delivery log.
///
/// Safe to use while a dispatcher is writing: the facade only reads, and
/// may observe any intermediate counter state — never one inconsistent
/// with "some prefix of recipients has been attempted".
#[derive(Clone)]
pub struct StatusFacade {
    jobs: Arc<dyn JobStore>,
}

impl StatusFacade {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        Self { jobs }
    }

    /// Progress for one job. `Ok(None)` when the job does not exist or
    /// belongs to a different group than requested.
    pub async fn status(
        &self,
        group_id: Uuid,
        job_id: Uuid,
    ) -> Result<Option<JobProgress>, StoreError> {
        let Some(job) = self.jobs.get(job_id).await? else {
            return Ok(None);
        };
        if job.group_id != group_id {
            return Ok(None);
        }
        Ok(Some(JobProgress::from(&job)))
    }

    /// A group's delivery history, newest first.
    pub async fn history(
        &self,
        group_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<HistoryPage, StoreError> {
        let entries = self.jobs.list_logs(group_id, limit, offset).await?;
        let total = self.jobs.count_logs(group_id).await?;
        Ok(HistoryPage {
            entries,
            total,
            limit,
            offset,
        })
    }

    /// Delete one history entry. Reports success whether or not the entry
    /// existed; job counters are never adjusted retroactively.
    pub async fn delete_log_entry(&self, group_id: Uuid, log_id: Uuid) -> Result<(), StoreError> {
        self.jobs.delete_log(group_id, log_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_and_handles_zero() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
    }
}
