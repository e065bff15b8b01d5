//! certmail: asynchronous mail job processing for certificate delivery.
//!
//! A certificate group's recipients are submitted as a batch, persisted as a
//! trackable [`MailJob`](jobs::MailJob), and worked off by a detached task
//! that sends one personalized, attachment-bearing email per recipient
//! through the group's own SMTP transport. Failures are isolated per
//! recipient; progress is pollable at any time.
//!
//! # Architecture
//!
//! - [`jobs::Dispatcher`] — validates and creates jobs, then drives each one
//!   through `pending → processing → completed | failed`.
//! - [`jobs::JobStore`] / [`jobs::GroupStore`] — storage seams owned by the
//!   application; [`jobs::MemoryJobStore`] ships for development and tests.
//! - [`mail::TransportResolver`] — loads and decrypts a group's SMTP
//!   credentials.
//! - [`mail::SmtpMailer`] — lettre-backed delivery, built fresh per job.
//! - [`template::render`] — literal `{placeholder}` substitution.
//! - [`certificates::AttachmentResolver`] — locates the generated artifact
//!   to attach.
//! - [`jobs::StatusFacade`] — percentage-complete projection and paginated
//!   delivery history for polling clients.
//! - [`jobs::Janitor`] — reconciliation sweep that fails jobs orphaned in
//!   `processing` by a crashed process.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use certmail::config::DispatcherConfig;
//! use certmail::crypto::EncryptionKey;
//! use certmail::jobs::{Dispatcher, MemoryJobStore, StatusFacade};
//! use certmail::mail::{SmtpMailerFactory, TransportResolver};
//!
//! let key = EncryptionKey::try_from_base64(&std::env::var("TRANSPORT_KEY")?)?;
//! let jobs = Arc::new(MemoryJobStore::new());
//! let config = DispatcherConfig::default();
//!
//! let dispatcher = Dispatcher::new(
//!     jobs.clone(),
//!     groups,                                  // your GroupStore
//!     certificates,                            // your CertificateStore
//!     TransportResolver::new(transports, key), // your TransportStore
//!     Arc::new(SmtpMailerFactory::new(config.send_timeout())),
//!     config,
//! );
//!
//! // Creation returns immediately; the job runs in the background.
//! let job = dispatcher.enqueue(group_id, recipients).await?;
//!
//! // Poll from anywhere.
//! let facade = StatusFacade::new(jobs);
//! let progress = facade.status(group_id, job.id).await?;
//! ```

pub mod certificates;
pub mod config;
pub mod crypto;
pub mod jobs;
pub mod mail;
pub mod template;

pub use config::EnvConfig;
