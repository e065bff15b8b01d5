//! Mailer trait and SMTP implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Body, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::message::{AttachmentSource, Email, EmailAttachment, EmailBody};
use super::transport::{Encryption, TransportConfig};
use super::MailError;

/// Async email sending trait.
///
/// The dispatcher only ever talks to this seam, so tests can substitute
/// recording or failing implementations.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send an email.
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Builds a [`Mailer`] for one job execution.
///
/// The transport is opened fresh per job: credentials stay scoped to the
/// owning group and no connection is shared across concurrently running
/// jobs.
pub trait MailerFactory: Send + Sync {
    fn create(&self, config: &TransportConfig) -> Result<Arc<dyn Mailer>, MailError>;
}

/// [`MailerFactory`] producing [`SmtpMailer`]s.
pub struct SmtpMailerFactory {
    timeout: Duration,
}

impl SmtpMailerFactory {
    /// `timeout` bounds connection establishment and socket I/O per send.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl MailerFactory for SmtpMailerFactory {
    fn create(&self, config: &TransportConfig) -> Result<Arc<dyn Mailer>, MailError> {
        Ok(Arc::new(SmtpMailer::from_config(config, self.timeout)?))
    }
}

/// SMTP-based mailer using lettre.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    http: reqwest::Client,
}

impl SmtpMailer {
    /// Build a mailer from a group's resolved transport configuration.
    pub fn from_config(config: &TransportConfig, timeout: Duration) -> Result<Self, MailError> {
        let builder = match config.encryption {
            Encryption::Ssl => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Smtp(e.to_string()))?,
            Encryption::Tls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Smtp(e.to_string()))?,
            Encryption::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
        };

        let transport = builder
            .port(config.port)
            .timeout(Some(timeout))
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.expose().to_string(),
            ))
            .build();

        Ok(Self {
            transport,
            http: reqwest::Client::new(),
        })
    }

    /// Fetch attachment bytes from wherever the artifact lives.
    async fn fetch_attachment(&self, attachment: &EmailAttachment) -> Result<SinglePart, MailError> {
        let bytes = match &attachment.source {
            AttachmentSource::Url(url) => {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map_err(|e| MailError::Attachment(e.to_string()))?;

                response
                    .bytes()
                    .await
                    .map_err(|e| MailError::Attachment(e.to_string()))?
                    .to_vec()
            }
            AttachmentSource::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| MailError::Attachment(format!("{}: {e}", path.display())))?,
        };

        let content_type = ContentType::parse(attachment.content_type())
            .map_err(|e| MailError::Build(e.to_string()))?;

        Ok(Attachment::new(attachment.filename.clone()).body(Body::new(bytes), content_type))
    }

    /// Build a lettre Message from our Email type.
    async fn build_message(&self, email: &Email) -> Result<Message, MailError> {
        let from_address: Address = email
            .from
            .parse()
            .map_err(|_| MailError::InvalidAddress(email.from.clone()))?;
        let from = Mailbox::new(email.from_name.clone(), from_address);

        let to: Mailbox = email
            .to
            .parse()
            .map_err(|_| MailError::InvalidAddress(email.to.clone()))?;

        let mut builder = Message::builder().from(from).to(to);

        if let Some(reply_to) = &email.reply_to {
            let mailbox: Mailbox = reply_to
                .parse()
                .map_err(|_| MailError::InvalidAddress(reply_to.clone()))?;
            builder = builder.reply_to(mailbox);
        }

        builder = builder.subject(&email.subject);

        let body_part = match &email.body {
            EmailBody::Text(text) => SinglePart::plain(text.clone()),
            EmailBody::Html(html) => SinglePart::html(html.clone()),
        };

        let message = match &email.attachment {
            Some(attachment) => {
                let file_part = self.fetch_attachment(attachment).await?;
                builder
                    .multipart(MultiPart::mixed().singlepart(body_part).singlepart(file_part))
                    .map_err(|e| MailError::Build(e.to_string()))?
            }
            None => builder
                .singlepart(body_part)
                .map_err(|e| MailError::Build(e.to_string()))?,
        };

        Ok(message)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let message = self.build_message(email).await?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        Ok(())
    }
}
