use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Status of a mail job.
///
/// `Pending → Processing → Completed | Failed`; terminal states are final.
/// `Failed` means the job never began sending (missing configuration) or
/// every single recipient failed — one successful recipient makes the job
/// `Completed`, with failures visible through the counters and the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// For persistent backends: JobStatus <-> String conversion
impl TryFrom<String> for JobStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// One addressee in a job's recipient snapshot.
///
/// Custom fields are stored verbatim for template substitution — arbitrary
/// keys, no schema beyond the presence of `email`. Serde aliases accept the
/// wire names used by the creation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    #[serde(default)]
    pub name: String,
    /// Reference to the recipient's generated certificate, if any.
    #[serde(default, alias = "certificateReference")]
    pub certificate: Option<String>,
    /// Free-form per-recipient template variables.
    #[serde(default, alias = "data")]
    pub fields: HashMap<String, String>,
}

/// One batch request to email a set of recipients for a certificate group.
///
/// The recipient list is snapshotted at creation and immutable thereafter;
/// later changes to the source data do not affect a job in flight. Fields
/// map directly to database columns when using a persistent backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailJob {
    pub id: Uuid,
    /// Owning group. The group's lifecycle is external to this crate.
    pub group_id: Uuid,
    pub status: JobStatus,
    pub total: u32,
    pub sent: u32,
    pub failed: u32,
    pub pending: u32,
    pub recipients: Vec<Recipient>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl MailJob {
    /// Create a new pending job. Establishes the counter invariant
    /// `sent + failed + pending == total`.
    pub fn new(group_id: Uuid, recipients: Vec<Recipient>) -> Self {
        let now = OffsetDateTime::now_utc();
        let total = recipients.len() as u32;
        Self {
            id: Uuid::new_v4(),
            group_id,
            status: JobStatus::Pending,
            total,
            sent: 0,
            failed: 0,
            pending: total,
            recipients,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Sent,
    Failed,
}

impl std::fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sent => write!(f, "sent"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl TryFrom<String> for LogStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown log status: {other}")),
        }
    }
}

/// Audit record of one delivery attempt, appended per recipient.
///
/// Recipient data is denormalized so the entry stays meaningful after the
/// source recipient changes or disappears. The subject is stored
/// post-substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailLogEntry {
    pub id: Uuid,
    pub group_id: Uuid,
    pub job_id: Uuid,
    pub email: String,
    pub name: String,
    /// Rendered subject line, for audit.
    pub subject: String,
    pub status: LogStatus,
    /// Present iff the attempt failed.
    pub error: Option<String>,
    /// Present iff the attempt succeeded.
    pub sent_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl MailLogEntry {
    /// Entry for a successful delivery.
    pub fn sent(job: &MailJob, recipient: &Recipient, subject: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            group_id: job.group_id,
            job_id: job.id,
            email: recipient.email.clone(),
            name: recipient.name.clone(),
            subject: subject.into(),
            status: LogStatus::Sent,
            error: None,
            sent_at: Some(now),
            created_at: now,
        }
    }

    /// Entry for a failed delivery attempt, with the underlying error text
    /// preserved verbatim for operator diagnosis.
    pub fn failed(
        job: &MailJob,
        recipient: &Recipient,
        subject: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id: job.group_id,
            job_id: job.id,
            email: recipient.email.clone(),
            name: recipient.name.clone(),
            subject: subject.into(),
            status: LogStatus::Failed,
            error: Some(error.into()),
            sent_at: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
