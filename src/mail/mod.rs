//! Outbound mail: per-group transport resolution, message building, and
//! SMTP delivery.
//!
//! Each certificate group brings its own SMTP account. The
//! [`TransportResolver`] turns the group's stored (encrypted) settings into
//! a ready-to-use [`TransportConfig`]; a [`MailerFactory`] then opens a
//! fresh transport for the duration of one job execution.

mod mailer;
mod message;
mod transport;

pub use mailer::{Mailer, MailerFactory, SmtpMailer, SmtpMailerFactory};
pub use message::{AttachmentSource, Email, EmailAttachment, EmailBody, EmailBuilder};
pub use transport::{
    Encryption, Secret, TransportConfig, TransportError, TransportRecord, TransportResolver,
    TransportStore,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("failed to fetch attachment: {0}")]
    Attachment(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("send timed out after {0} seconds")]
    Timeout(u64),
}
