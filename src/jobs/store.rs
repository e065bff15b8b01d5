use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::job::{JobStatus, MailJob, MailLogEntry};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A certificate group's mail-relevant settings, as the platform stores
/// them. The group record itself is owned by the application.
#[derive(Debug, Clone)]
pub struct CertificateGroup {
    pub id: Uuid,
    pub name: String,
    /// Subject template; `None` until the group configures one.
    pub email_subject: Option<String>,
    /// Body template; `None` until the group configures one.
    pub email_body: Option<String>,
}

/// Storage seam for group records. Owned by the application.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Fetch a group by id. `Ok(None)` when no such group exists.
    async fn find(&self, group_id: Uuid) -> Result<Option<CertificateGroup>, StoreError>;
}

/// Durable storage for jobs and delivery logs. Owned by the application.
///
/// Each method maps to a single storage operation, making implementations
/// straightforward — for SQL backends each method is one query. The store
/// must support concurrent writers across distinct job ids; within one job
/// id writes arrive from a single dispatcher task, but the facade reads
/// concurrently, so counter updates must be atomic per row rather than
/// read-modify-write.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job. Must not leave a partially-written job visible to
    /// readers.
    async fn create(&self, job: &MailJob) -> Result<(), StoreError>;

    /// Fetch a job by id. `Ok(None)` when no such job exists.
    async fn get(&self, job_id: Uuid) -> Result<Option<MailJob>, StoreError>;

    /// Set a job's status and touch its update timestamp.
    async fn set_status(&self, job_id: Uuid, status: JobStatus) -> Result<(), StoreError>;

    /// Persist the aggregate counters in one write.
    async fn update_counters(
        &self,
        job_id: Uuid,
        sent: u32,
        failed: u32,
        pending: u32,
    ) -> Result<(), StoreError>;

    /// Append one delivery log entry.
    async fn append_log(&self, entry: &MailLogEntry) -> Result<(), StoreError>;

    /// Page through a group's delivery log, most recent first.
    async fn list_logs(
        &self,
        group_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<MailLogEntry>, StoreError>;

    /// Total delivery log entries for a group.
    async fn count_logs(&self, group_id: Uuid) -> Result<u64, StoreError>;

    /// Delete one log entry by id within a group. Succeeds whether or not
    /// the entry existed.
    async fn delete_log(&self, group_id: Uuid, log_id: Uuid) -> Result<(), StoreError>;

    /// Ids of jobs still in `processing` whose last update precedes
    /// `cutoff`. Consumed by the janitor sweep.
    async fn stale_processing(&self, cutoff: OffsetDateTime) -> Result<Vec<Uuid>, StoreError>;
}
