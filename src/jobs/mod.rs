//! Mail job processing: trackable jobs, per-recipient dispatch, and
//! pollable progress.
//!
//! # Architecture
//!
//! - [`MailJob`] / [`MailLogEntry`] — the persisted job record (recipient
//!   snapshot + counters) and the append-only delivery audit log.
//! - [`JobStore`] / [`GroupStore`] — storage seams owned by the
//!   application. Each method is a single storage operation.
//! - [`MemoryJobStore`] — in-memory store for development and testing.
//! - [`Dispatcher`] — validates and creates jobs, then drives each one
//!   end-to-end: `pending → processing → completed | failed`.
//! - [`StatusFacade`] — read-only progress and history projections for
//!   polling clients.
//! - [`Janitor`] — reconciliation sweep for jobs orphaned in `processing`.
//!
//! # Quick Start
//!
//! ```ignore
//! // 1. Wire the dispatcher once at startup
//! let dispatcher = Dispatcher::new(jobs, groups, certificates, transports, mailers, config);
//!
//! // 2. Enqueue a batch; returns as soon as the job row exists
//! let job = dispatcher.enqueue(group_id, recipients).await?;
//!
//! // 3. Poll progress from the HTTP layer
//! let progress = facade.status(group_id, job.id).await?;
//! ```

mod dispatcher;
mod janitor;
mod job;
mod memory;
mod status;
mod store;

pub use dispatcher::{DispatchError, Dispatcher};
pub use janitor::Janitor;
pub use job::{JobStatus, LogStatus, MailJob, MailLogEntry, Recipient};
pub use memory::MemoryJobStore;
pub use status::{HistoryPage, JobAccepted, JobProgress, StatusFacade};
pub use store::{CertificateGroup, GroupStore, JobStore, StoreError};
