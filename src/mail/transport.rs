//! Per-group transport configuration and credential resolution.
//!
//! Each certificate group configures its own outbound SMTP account. The
//! credential is sealed with [`crate::crypto`] before it reaches durable
//! storage; the resolver is the only place plaintext is produced, and even
//! then behind the Debug-redacted [`Secret`] wrapper, so neither the
//! dispatcher nor its logs ever see raw key material.

use core::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{self, CryptoError, EncryptionKey};

/// Connection security for an SMTP transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encryption {
    /// Implicit TLS from the first byte (SMTPS, typically port 465).
    Ssl,
    /// STARTTLS upgrade on a plaintext connection (typically port 587).
    Tls,
    /// No transport security. Local relays only.
    None,
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssl => write!(f, "ssl"),
            Self::Tls => write!(f, "tls"),
            Self::None => write!(f, "none"),
        }
    }
}

// For persistent backends: Encryption <-> String conversion
impl TryFrom<String> for Encryption {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "ssl" => Ok(Self::Ssl),
            "tls" => Ok(Self::Tls),
            "none" => Ok(Self::None),
            other => Err(format!("unknown encryption mode: {other}")),
        }
    }
}

/// A group's transport settings as stored, credential encrypted at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportRecord {
    pub group_id: Uuid,
    pub host: String,
    pub port: u16,
    /// Authenticating email address; also the fallback sender identity.
    pub username: String,
    pub password_ciphertext: Vec<u8>,
    pub encryption: Encryption,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
}

/// Decrypted SMTP credential.
///
/// `Debug` output is redacted so the credential cannot leak through logs.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: String) -> Self {
        Secret(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

/// Ready-to-use transport configuration for one group.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Secret,
    pub encryption: Encryption,
    pub from_name: Option<String>,
    pub reply_to: Option<String>,
}

impl TransportConfig {
    /// Reply-to address: the configured one, or the authenticating email.
    pub fn reply_to(&self) -> &str {
        self.reply_to.as_deref().unwrap_or(&self.username)
    }

    /// Sender display name: the configured one, or the authenticating email.
    pub fn sender_name(&self) -> &str {
        self.from_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport store unavailable: {0}")]
    Store(String),

    #[error("failed to decrypt transport credential: {0}")]
    Decrypt(#[from] CryptoError),
}

/// Storage seam for per-group transport records. Owned by the application.
#[async_trait]
pub trait TransportStore: Send + Sync {
    /// Fetch the stored transport record for a group. `Ok(None)` means the
    /// group has not configured a transport yet — a legitimate state, not
    /// an error.
    async fn find(&self, group_id: Uuid) -> Result<Option<TransportRecord>, TransportError>;
}

/// Loads a group's transport settings and decrypts the credential.
#[derive(Clone)]
pub struct TransportResolver {
    store: Arc<dyn TransportStore>,
    key: EncryptionKey,
}

impl TransportResolver {
    pub fn new(store: Arc<dyn TransportStore>, key: EncryptionKey) -> Self {
        Self { store, key }
    }

    /// Resolve a ready-to-use [`TransportConfig`] for the group.
    ///
    /// `Ok(None)` when no transport is configured. A credential that fails
    /// to decrypt is an unrecoverable configuration error, distinct from
    /// absence. Fast local lookup — no retries.
    pub async fn resolve(&self, group_id: Uuid) -> Result<Option<TransportConfig>, TransportError> {
        let Some(record) = self.store.find(group_id).await? else {
            return Ok(None);
        };

        let password = crypto::decrypt(self.key.clone(), record.password_ciphertext).await?;

        Ok(Some(TransportConfig {
            host: record.host,
            port: record.port,
            username: record.username,
            password: Secret::new(password),
            encryption: record.encryption,
            from_name: record.from_name,
            reply_to: record.reply_to,
        }))
    }
}
