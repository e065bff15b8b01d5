//! Certificate artifact lookup for attachment resolution.
//!
//! Recipients may reference a generated certificate; the resolver turns
//! that reference into a concrete attachment (filename + storage location)
//! plus the certificate's human-assigned code for template substitution.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::mail::EmailAttachment;

/// A generated certificate artifact as the platform stores it.
#[derive(Debug, Clone)]
pub struct CertificateRecord {
    /// Raw certificate reference, as carried on the recipient.
    pub id: String,
    /// Human-assigned short code (e.g. `AB12-CD34`), shown on the
    /// certificate and usable as a template variable.
    pub code: String,
    pub filename: String,
    /// Public URL of the rendered artifact, when uploaded.
    pub file_url: Option<String>,
    /// Local path of the rendered artifact, when kept on disk.
    pub file_path: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum CertificateError {
    #[error("certificate store unavailable: {0}")]
    Store(String),
}

/// Storage seam for certificate records. Owned by the application.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Look up a certificate by its raw reference. `Ok(None)` when no such
    /// record exists.
    async fn find(&self, reference: &str) -> Result<Option<CertificateRecord>, CertificateError>;
}

/// An attachment resolved from a certificate reference.
#[derive(Debug, Clone)]
pub struct ResolvedAttachment {
    pub attachment: EmailAttachment,
    /// The certificate's human-assigned code.
    pub code: String,
}

/// Resolves a recipient's certificate reference into an attachment.
#[derive(Clone)]
pub struct AttachmentResolver {
    store: Arc<dyn CertificateStore>,
}

impl AttachmentResolver {
    pub fn new(store: Arc<dyn CertificateStore>) -> Self {
        Self { store }
    }

    /// Resolve the attachment for a recipient, if any.
    ///
    /// `Ok(None)` when the recipient carries no reference, the record is
    /// missing, or the artifact has no stored location — the send proceeds
    /// without an attachment rather than failing the recipient. A store
    /// error propagates so the caller can fail just that recipient.
    ///
    /// The remote URL is preferred over the local path; at most one
    /// location is used.
    pub async fn resolve(
        &self,
        reference: Option<&str>,
    ) -> Result<Option<ResolvedAttachment>, CertificateError> {
        let Some(reference) = reference else {
            return Ok(None);
        };

        let Some(record) = self.store.find(reference).await? else {
            tracing::debug!(reference, "certificate not found, sending without attachment");
            return Ok(None);
        };

        let attachment = if let Some(url) = record.file_url {
            EmailAttachment::from_url(record.filename, url)
        } else if let Some(path) = record.file_path {
            EmailAttachment::from_path(record.filename, path)
        } else {
            tracing::debug!(reference, "certificate has no stored artifact");
            return Ok(None);
        };

        Ok(Some(ResolvedAttachment {
            attachment,
            code: record.code,
        }))
    }
}
