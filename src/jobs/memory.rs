use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::job::{JobStatus, MailJob, MailLogEntry};
use super::store::{JobStore, StoreError};

/// In-memory [`JobStore`] for development and testing.
///
/// Jobs and log entries live behind a mutex. Not durable — everything is
/// lost on restart.
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, MailJob>,
    logs: Vec<MailLogEntry>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &MailJob) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<MailJob>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.jobs.get(&job_id).cloned())
    }

    async fn set_status(&self, job_id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.jobs.get_mut(&job_id) {
            job.status = status;
            job.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn update_counters(
        &self,
        job_id: Uuid,
        sent: u32,
        failed: u32,
        pending: u32,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.jobs.get_mut(&job_id) {
            job.sent = sent;
            job.failed = failed;
            job.pending = pending;
            job.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }

    async fn append_log(&self, entry: &MailLogEntry) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.logs.push(entry.clone());
        Ok(())
    }

    async fn list_logs(
        &self,
        group_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<MailLogEntry>, StoreError> {
        let inner = self.inner.lock().await;
        // Entries are appended in send order; newest first is the reverse.
        Ok(inner
            .logs
            .iter()
            .rev()
            .filter(|entry| entry.group_id == group_id)
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_logs(&self, group_id: Uuid) -> Result<u64, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .logs
            .iter()
            .filter(|entry| entry.group_id == group_id)
            .count() as u64)
    }

    async fn delete_log(&self, group_id: Uuid, log_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .logs
            .retain(|entry| !(entry.id == log_id && entry.group_id == group_id));
        Ok(())
    }

    async fn stale_processing(&self, cutoff: OffsetDateTime) -> Result<Vec<Uuid>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .jobs
            .values()
            .filter(|job| job.status == JobStatus::Processing && job.updated_at < cutoff)
            .map(|job| job.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::Recipient;

    fn job_with_recipient(group_id: Uuid) -> MailJob {
        MailJob::new(
            group_id,
            vec![Recipient {
                email: "a@b.com".into(),
                name: "Ann".into(),
                certificate: None,
                fields: HashMap::new(),
            }],
        )
    }

    #[tokio::test]
    async fn logs_list_newest_first() {
        let store = MemoryJobStore::new();
        let group_id = Uuid::new_v4();
        let job = job_with_recipient(group_id);
        let recipient = &job.recipients[0];

        for subject in ["first", "second", "third"] {
            store
                .append_log(&MailLogEntry::sent(&job, recipient, subject))
                .await
                .unwrap();
        }

        let logs = store.list_logs(group_id, 10, 0).await.unwrap();
        let subjects: Vec<_> = logs.iter().map(|entry| entry.subject.as_str()).collect();
        assert_eq!(subjects, ["third", "second", "first"]);

        let page = store.list_logs(group_id, 1, 1).await.unwrap();
        assert_eq!(page[0].subject, "second");
    }

    #[tokio::test]
    async fn delete_log_is_unconditional() {
        let store = MemoryJobStore::new();
        let group_id = Uuid::new_v4();

        // Deleting an id that was never inserted still succeeds.
        store.delete_log(group_id, Uuid::new_v4()).await.unwrap();
        assert_eq!(store.count_logs(group_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn counters_update_in_one_write() {
        let store = MemoryJobStore::new();
        let job = job_with_recipient(Uuid::new_v4());
        store.create(&job).await.unwrap();

        store.update_counters(job.id, 1, 0, 0).await.unwrap();

        let stored = store.get(job.id).await.unwrap().unwrap();
        assert_eq!((stored.sent, stored.failed, stored.pending), (1, 0, 0));
        assert!(stored.updated_at >= job.updated_at);
    }
}
