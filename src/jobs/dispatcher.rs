use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::Instrument;
use uuid::Uuid;

use crate::certificates::{AttachmentResolver, CertificateStore};
use crate::config::DispatcherConfig;
use crate::mail::{
    Email, MailError, Mailer, MailerFactory, TransportConfig, TransportError, TransportResolver,
};
use crate::template::render;

use super::job::{JobStatus, MailJob, MailLogEntry, Recipient};
use super::store::{GroupStore, JobStore, StoreError};

/// Backoff between attempts of a failed store write.
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("group not found")]
    GroupNotFound,

    #[error("group has no subject/body template configured")]
    MissingTemplate,

    #[error("no mail transport configured for group")]
    TransportNotConfigured,

    #[error("at least one recipient is required")]
    NoRecipients,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::GroupNotFound => StatusCode::NOT_FOUND,
            Self::NoRecipients => StatusCode::BAD_REQUEST,
            Self::MissingTemplate | Self::TransportNotConfigured => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Store(_) | Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "status": "error", "message": self.to_string() }));
        (status, body).into_response()
    }
}

/// Outcome of one recipient attempt. The rendered subject is kept either
/// way — the delivery log stores it post-substitution.
struct Attempt {
    subject: String,
    result: Result<(), String>,
}

/// Orchestrates mail jobs end-to-end.
///
/// One `Dispatcher` is wired at startup with the application's storage
/// seams and handed to the HTTP layer — cloning is cheap and every clone
/// shares the same collaborators. Each job executes as its own detached
/// task; distinct jobs may run concurrently, but callers must not trigger
/// two executions of the same job id.
#[derive(Clone)]
pub struct Dispatcher {
    jobs: Arc<dyn JobStore>,
    groups: Arc<dyn GroupStore>,
    certificates: AttachmentResolver,
    transports: TransportResolver,
    mailers: Arc<dyn MailerFactory>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        groups: Arc<dyn GroupStore>,
        certificates: Arc<dyn CertificateStore>,
        transports: TransportResolver,
        mailers: Arc<dyn MailerFactory>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            jobs,
            groups,
            certificates: AttachmentResolver::new(certificates),
            transports,
            mailers,
            config,
        }
    }

    /// Validate preconditions and persist a new `pending` job.
    ///
    /// The recipient list must be non-empty, the group must exist with both
    /// templates configured, and a transport must resolve. Nothing is
    /// persisted when validation fails — rejected batches leave no job row
    /// behind.
    pub async fn create(
        &self,
        group_id: Uuid,
        recipients: Vec<Recipient>,
    ) -> Result<MailJob, DispatchError> {
        if recipients.is_empty() {
            return Err(DispatchError::NoRecipients);
        }

        let group = self
            .groups
            .find(group_id)
            .await?
            .ok_or(DispatchError::GroupNotFound)?;
        if group.email_subject.is_none() || group.email_body.is_none() {
            return Err(DispatchError::MissingTemplate);
        }

        if self.transports.resolve(group_id).await?.is_none() {
            return Err(DispatchError::TransportNotConfigured);
        }

        let job = MailJob::new(group_id, recipients);
        self.jobs.create(&job).await?;
        tracing::info!(job_id = %job.id, %group_id, total = job.total, "mail job created");
        Ok(job)
    }

    /// Create a job and start it in the background; returns as soon as the
    /// job row exists.
    pub async fn enqueue(
        &self,
        group_id: Uuid,
        recipients: Vec<Recipient>,
    ) -> Result<MailJob, DispatchError> {
        let job = self.create(group_id, recipients).await?;
        self.spawn(job.id);
        Ok(job)
    }

    /// Start a job in the background and return immediately.
    ///
    /// The detached task holds only the job id and the dispatcher's own
    /// cheaply-cloned handles, never request-scoped state, so it outlives
    /// the request that triggered it.
    pub fn spawn(&self, job_id: Uuid) {
        let dispatcher = self.clone();
        let span = tracing::info_span!("mail_job", %job_id);
        tokio::spawn(async move { dispatcher.execute(job_id).await }.instrument(span));
    }

    /// Run one job to a terminal state.
    ///
    /// A missing job aborts silently (log only) — the caller has no way to
    /// observe a job that was never created. The status check below is
    /// advisory, not a lock: callers own the guarantee that a job id is
    /// executed at most once at a time.
    pub async fn execute(&self, job_id: Uuid) {
        let job = match self.jobs.get(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::error!(%job_id, "job not found, nothing to execute");
                return;
            }
            Err(e) => {
                tracing::error!(%job_id, error = %e, "failed to load job");
                return;
            }
        };

        if job.status != JobStatus::Pending {
            tracing::warn!(%job_id, status = %job.status, "job already started, refusing to run");
            return;
        }

        self.run(job).await;
    }

    async fn run(&self, job: MailJob) {
        let job_id = job.id;

        if self
            .with_retry(job_id, "status", || {
                self.jobs.set_status(job_id, JobStatus::Processing)
            })
            .await
            .is_err()
        {
            tracing::error!(%job_id, "could not transition job to processing");
            return;
        }

        // Configuration errors fail the whole job before any send attempt
        // and leave no log entries.
        let group = match self.groups.find(job.group_id).await {
            Ok(Some(group)) => group,
            Ok(None) => return self.fail_job(job_id, "owning group no longer exists").await,
            Err(e) => {
                return self
                    .fail_job(job_id, &format!("group lookup failed: {e}"))
                    .await
            }
        };

        let (subject_template, body_template) = match (group.email_subject, group.email_body) {
            (Some(subject), Some(body)) => (subject, body),
            _ => {
                return self
                    .fail_job(job_id, "group has no subject/body template")
                    .await
            }
        };

        let transport = match self.transports.resolve(job.group_id).await {
            Ok(Some(transport)) => transport,
            Ok(None) => return self.fail_job(job_id, "no transport configured").await,
            Err(e) => {
                return self
                    .fail_job(job_id, &format!("transport resolution failed: {e}"))
                    .await
            }
        };

        let mailer = match self.mailers.create(&transport) {
            Ok(mailer) => mailer,
            Err(e) => {
                return self
                    .fail_job(job_id, &format!("transport setup failed: {e}"))
                    .await
            }
        };

        let total = job.total;
        let mut sent: u32 = 0;
        let mut failed: u32 = 0;

        // Strictly in creation order. A failed recipient never aborts the
        // loop; pacing applies between consecutive attempts regardless of
        // outcome.
        for (index, recipient) in job.recipients.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.pacing()).await;
            }

            let attempt = self
                .attempt(
                    recipient,
                    &subject_template,
                    &body_template,
                    &transport,
                    mailer.as_ref(),
                )
                .await;

            let entry = match attempt.result {
                Ok(()) => {
                    sent += 1;
                    tracing::debug!(%job_id, recipient = %recipient.email, "delivery succeeded");
                    MailLogEntry::sent(&job, recipient, attempt.subject)
                }
                Err(error) => {
                    failed += 1;
                    tracing::warn!(%job_id, recipient = %recipient.email, %error, "delivery failed");
                    MailLogEntry::failed(&job, recipient, attempt.subject, error)
                }
            };

            // Persist the log entry and live counters after every attempt
            // so a concurrent poller observes progress.
            let log_written = self
                .with_retry(job_id, "log append", || self.jobs.append_log(&entry))
                .await;
            let counters_written = self
                .with_retry(job_id, "counters", || {
                    self.jobs
                        .update_counters(job_id, sent, failed, total - sent - failed)
                })
                .await;

            if log_written.is_err() || counters_written.is_err() {
                // Progress can no longer be recorded truthfully; surface
                // the job as failed rather than continuing silently.
                return self.fail_job(job_id, "store writes exhausted retries").await;
            }
        }

        // Partial success is success at the job level: failed only when
        // every single attempt failed.
        let status = if failed == total {
            JobStatus::Failed
        } else {
            JobStatus::Completed
        };

        if self
            .with_retry(job_id, "counters", || {
                self.jobs.update_counters(job_id, sent, failed, 0)
            })
            .await
            .is_err()
            || self
                .with_retry(job_id, "status", || self.jobs.set_status(job_id, status))
                .await
                .is_err()
        {
            tracing::error!(%job_id, "could not persist terminal state");
            return;
        }

        tracing::info!(%job_id, %status, sent, failed, total, "mail job finished");
    }

    /// One recipient: resolve the attachment, render, build, send.
    ///
    /// Every failure mode — attachment store error, malformed address,
    /// transport rejection, timeout — is reported as the attempt's error
    /// string and isolated to this recipient.
    async fn attempt(
        &self,
        recipient: &Recipient,
        subject_template: &str,
        body_template: &str,
        transport: &TransportConfig,
        mailer: &dyn Mailer,
    ) -> Attempt {
        let resolved = match self
            .certificates
            .resolve(recipient.certificate.as_deref())
            .await
        {
            Ok(resolved) => resolved,
            Err(e) => {
                let vars = recipient_vars(recipient, None);
                return Attempt {
                    subject: render(subject_template, &vars),
                    result: Err(e.to_string()),
                };
            }
        };

        let vars = recipient_vars(recipient, resolved.as_ref().map(|r| r.code.as_str()));
        let subject = render(subject_template, &vars);
        let body = render(body_template, &vars);

        let mut builder = Email::builder()
            .to(recipient.email.clone())
            .from(transport.username.clone())
            .from_name(transport.sender_name())
            .reply_to(transport.reply_to())
            .subject(subject.clone())
            .html(body);

        if let Some(resolved) = resolved {
            builder = builder.attachment(resolved.attachment);
        }

        let email = match builder.build() {
            Ok(email) => email,
            Err(e) => {
                return Attempt {
                    subject,
                    result: Err(e.to_string()),
                }
            }
        };

        let result = match tokio::time::timeout(self.config.send_timeout(), mailer.send(&email))
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(MailError::Timeout(self.config.send_timeout_secs).to_string()),
        };

        Attempt { subject, result }
    }

    /// Mark a job failed after a configuration error or an unrecoverable
    /// store failure. Best-effort: the write itself is retried, then
    /// dropped with a log line.
    async fn fail_job(&self, job_id: Uuid, reason: &str) {
        tracing::error!(%job_id, reason, "mail job failed");
        if self
            .with_retry(job_id, "status", || {
                self.jobs.set_status(job_id, JobStatus::Failed)
            })
            .await
            .is_err()
        {
            tracing::error!(%job_id, "could not persist failed status");
        }
    }

    /// Retry a store write a bounded number of times before giving up.
    async fn with_retry<F, Fut>(&self, job_id: Uuid, what: &str, mut op: F) -> Result<(), StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        let mut attempt: u32 = 1;
        loop {
            match op().await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.config.store_retries => {
                    tracing::warn!(%job_id, what, error = %e, attempt, "store write failed, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(%job_id, what, error = %e, attempt, "store write failed permanently");
                    return Err(e);
                }
            }
        }
    }
}

/// Template variables for one recipient: custom fields overlaid with the
/// built-in aliases. Both capitalizations are provided so template authors
/// can write `{Name}` or `{name}`.
fn recipient_vars(recipient: &Recipient, certificate_code: Option<&str>) -> HashMap<String, String> {
    let mut vars = recipient.fields.clone();

    vars.insert("Name".into(), recipient.name.clone());
    vars.insert("name".into(), recipient.name.clone());
    vars.insert("Email".into(), recipient.email.clone());
    vars.insert("email".into(), recipient.email.clone());

    // The certificate's human-assigned code wins over the raw reference.
    let code = certificate_code.or(recipient.certificate.as_deref());
    if let Some(code) = code {
        vars.insert("CertificateID".into(), code.to_string());
        vars.insert("certificateId".into(), code.to_string());
    }

    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient() -> Recipient {
        Recipient {
            email: "ann@example.com".into(),
            name: "Ann".into(),
            certificate: Some("raw-ref".into()),
            fields: HashMap::from([("Course".to_string(), "Rust".to_string())]),
        }
    }

    #[test]
    fn vars_include_both_capitalizations() {
        let vars = recipient_vars(&recipient(), None);

        assert_eq!(vars["Name"], "Ann");
        assert_eq!(vars["name"], "Ann");
        assert_eq!(vars["Email"], "ann@example.com");
        assert_eq!(vars["email"], "ann@example.com");
        assert_eq!(vars["Course"], "Rust");
    }

    #[test]
    fn certificate_code_wins_over_raw_reference() {
        let vars = recipient_vars(&recipient(), Some("AB12"));
        assert_eq!(vars["CertificateID"], "AB12");
        assert_eq!(vars["certificateId"], "AB12");

        // Without a resolved code, the raw reference is still usable.
        let vars = recipient_vars(&recipient(), None);
        assert_eq!(vars["CertificateID"], "raw-ref");
    }

    #[test]
    fn builtins_override_custom_fields() {
        let mut shadowing = recipient();
        shadowing
            .fields
            .insert("Name".to_string(), "Impostor".to_string());

        let vars = recipient_vars(&shadowing, None);
        assert_eq!(vars["Name"], "Ann");
    }
}
