//! Shared stubs and wiring helpers for the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use certmail::certificates::{CertificateError, CertificateRecord, CertificateStore};
use certmail::config::DispatcherConfig;
use certmail::crypto::{self, EncryptionKey};
use certmail::jobs::{
    CertificateGroup, Dispatcher, GroupStore, MemoryJobStore, Recipient, StoreError,
};
use certmail::mail::{
    Email, Encryption, MailError, Mailer, MailerFactory, TransportConfig, TransportError,
    TransportRecord, TransportResolver, TransportStore,
};

pub fn test_key() -> EncryptionKey {
    EncryptionKey::try_from(&[7u8; 32][..]).unwrap()
}

pub fn recipient(email: &str, name: &str) -> Recipient {
    Recipient {
        email: email.to_string(),
        name: name.to_string(),
        certificate: None,
        fields: HashMap::new(),
    }
}

pub fn recipient_with_certificate(email: &str, name: &str, reference: &str) -> Recipient {
    Recipient {
        certificate: Some(reference.to_string()),
        ..recipient(email, name)
    }
}

pub fn certificate(reference: &str, code: &str) -> CertificateRecord {
    CertificateRecord {
        id: reference.to_string(),
        code: code.to_string(),
        filename: "certificate.pdf".to_string(),
        file_url: Some("https://cdn.example.com/certificate.pdf".to_string()),
        file_path: None,
    }
}

// ---------------------------------------------------------------------------
// Store stubs
// ---------------------------------------------------------------------------

pub struct StubGroupStore(HashMap<Uuid, CertificateGroup>);

impl StubGroupStore {
    pub fn with(group: CertificateGroup) -> Arc<Self> {
        Arc::new(Self(HashMap::from([(group.id, group)])))
    }
}

#[async_trait]
impl GroupStore for StubGroupStore {
    async fn find(&self, group_id: Uuid) -> Result<Option<CertificateGroup>, StoreError> {
        Ok(self.0.get(&group_id).cloned())
    }
}

pub struct StubTransportStore(HashMap<Uuid, TransportRecord>);

impl StubTransportStore {
    pub fn with(record: TransportRecord) -> Arc<Self> {
        Arc::new(Self(HashMap::from([(record.group_id, record)])))
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self(HashMap::new()))
    }
}

#[async_trait]
impl TransportStore for StubTransportStore {
    async fn find(&self, group_id: Uuid) -> Result<Option<TransportRecord>, TransportError> {
        Ok(self.0.get(&group_id).cloned())
    }
}

pub struct StubCertificateStore(HashMap<String, CertificateRecord>);

impl StubCertificateStore {
    pub fn with(records: Vec<CertificateRecord>) -> Arc<Self> {
        Arc::new(Self(
            records.into_iter().map(|r| (r.id.clone(), r)).collect(),
        ))
    }
}

#[async_trait]
impl CertificateStore for StubCertificateStore {
    async fn find(&self, reference: &str) -> Result<Option<CertificateRecord>, CertificateError> {
        Ok(self.0.get(reference).cloned())
    }
}

// ---------------------------------------------------------------------------
// Mailer stub
// ---------------------------------------------------------------------------

/// Records sent emails; addresses in `fail` are rejected at the transport
/// level.
#[derive(Default)]
pub struct StubMailer {
    pub sent: Mutex<Vec<Email>>,
    pub fail: HashSet<String>,
}

#[async_trait]
impl Mailer for StubMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        if self.fail.contains(&email.to) {
            return Err(MailError::Smtp("550 mailbox unavailable".to_string()));
        }
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

pub struct StubMailerFactory(pub Arc<StubMailer>);

impl MailerFactory for StubMailerFactory {
    fn create(&self, _config: &TransportConfig) -> Result<Arc<dyn Mailer>, MailError> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub group_id: Uuid,
    pub jobs: Arc<MemoryJobStore>,
    pub mailer: Arc<StubMailer>,
    pub dispatcher: Dispatcher,
}

pub struct HarnessBuilder {
    fail: HashSet<String>,
    certificates: Vec<CertificateRecord>,
    config: DispatcherConfig,
    templates: bool,
    transport: bool,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            fail: HashSet::new(),
            certificates: Vec::new(),
            config: DispatcherConfig {
                pacing_ms: 0,
                send_timeout_secs: 5,
                store_retries: 3,
            },
            templates: true,
            transport: true,
        }
    }

    /// Reject deliveries to this address at the transport level.
    pub fn failing(mut self, email: &str) -> Self {
        self.fail.insert(email.to_string());
        self
    }

    pub fn certificate(mut self, record: CertificateRecord) -> Self {
        self.certificates.push(record);
        self
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn without_templates(mut self) -> Self {
        self.templates = false;
        self
    }

    pub fn without_transport(mut self) -> Self {
        self.transport = false;
        self
    }

    pub async fn build(self) -> Harness {
        let group_id = Uuid::new_v4();

        let group = CertificateGroup {
            id: group_id,
            name: "Rust 101".to_string(),
            email_subject: self
                .templates
                .then(|| "Dear {Name}, ID {CertificateID}".to_string()),
            email_body: self
                .templates
                .then(|| "Hello {Name}, your certificate {CertificateID} is attached.".to_string()),
        };

        let transports = if self.transport {
            let ciphertext = crypto::encrypt(test_key(), "hunter2".to_string())
                .await
                .unwrap();
            StubTransportStore::with(TransportRecord {
                group_id,
                host: "smtp.example.com".to_string(),
                port: 587,
                username: "mailer@example.com".to_string(),
                password_ciphertext: ciphertext,
                encryption: Encryption::Tls,
                from_name: Some("Certificate Team".to_string()),
                reply_to: None,
            })
        } else {
            StubTransportStore::empty()
        };

        let jobs = Arc::new(MemoryJobStore::new());
        let mailer = Arc::new(StubMailer {
            sent: Mutex::new(Vec::new()),
            fail: self.fail,
        });

        let dispatcher = Dispatcher::new(
            jobs.clone(),
            StubGroupStore::with(group),
            StubCertificateStore::with(self.certificates),
            TransportResolver::new(transports, test_key()),
            Arc::new(StubMailerFactory(mailer.clone())),
            self.config,
        );

        Harness {
            group_id,
            jobs,
            mailer,
            dispatcher,
        }
    }
}
