//! Email message types and builder.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::MailError;

/// The body content of an email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EmailBody {
    /// Plain text only.
    Text(String),
    /// HTML only.
    Html(String),
}

/// Where an attachment's bytes come from.
///
/// Generated certificates live either behind a public URL or on the local
/// filesystem; the mailer fetches whichever location was resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AttachmentSource {
    Url(String),
    Path(PathBuf),
}

/// A file attached to an outgoing message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAttachment {
    pub filename: String,
    pub source: AttachmentSource,
}

impl EmailAttachment {
    pub fn from_url(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            source: AttachmentSource::Url(url.into()),
        }
    }

    pub fn from_path(filename: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            source: AttachmentSource::Path(path.into()),
        }
    }

    /// MIME type derived from the filename extension.
    pub fn content_type(&self) -> &'static str {
        let extension = self
            .filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => "application/pdf",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            _ => "application/octet-stream",
        }
    }
}

/// A complete email message ready to send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email {
    /// Recipient address.
    pub to: String,
    /// Sender address.
    pub from: String,
    /// Optional sender display name.
    #[serde(default)]
    pub from_name: Option<String>,
    /// Optional reply-to address.
    #[serde(default)]
    pub reply_to: Option<String>,
    /// Email subject line.
    pub subject: String,
    /// Email body content.
    pub body: EmailBody,
    /// Optional file attachment.
    #[serde(default)]
    pub attachment: Option<EmailAttachment>,
}

impl Email {
    /// Create a new email builder.
    pub fn builder() -> EmailBuilder {
        EmailBuilder::default()
    }
}

/// Builder for constructing [`Email`] instances.
#[derive(Debug, Default)]
pub struct EmailBuilder {
    to: Option<String>,
    from: Option<String>,
    from_name: Option<String>,
    reply_to: Option<String>,
    subject: Option<String>,
    text: Option<String>,
    html: Option<String>,
    attachment: Option<EmailAttachment>,
}

impl EmailBuilder {
    /// Set the recipient address (required).
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to = Some(address.into());
        self
    }

    /// Set the sender address (required).
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Set the sender display name.
    pub fn from_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = Some(name.into());
        self
    }

    /// Set the reply-to address.
    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    /// Set the subject line.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set plain text body content.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set HTML body content. Takes precedence over text when both are set.
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// Attach a file.
    pub fn attachment(mut self, attachment: EmailAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Build the email, validating required fields.
    pub fn build(self) -> Result<Email, MailError> {
        let to = self
            .to
            .ok_or_else(|| MailError::Build("recipient required".into()))?;

        let from = self
            .from
            .ok_or_else(|| MailError::Build("from address required".into()))?;

        let subject = self
            .subject
            .ok_or_else(|| MailError::Build("subject required".into()))?;

        let body = match (self.text, self.html) {
            (_, Some(html)) => EmailBody::Html(html),
            (Some(text), None) => EmailBody::Text(text),
            (None, None) => return Err(MailError::Build("body required (text or html)".into())),
        };

        Ok(Email {
            to,
            from,
            from_name: self.from_name,
            reply_to: self.reply_to,
            subject,
            body,
            attachment: self.attachment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_text_email() {
        let email = Email::builder()
            .from("sender@example.com")
            .to("user@example.com")
            .subject("Hello")
            .text("Body text")
            .build()
            .unwrap();

        assert_eq!(email.from, "sender@example.com");
        assert_eq!(email.to, "user@example.com");
        assert_eq!(email.subject, "Hello");
        assert!(matches!(email.body, EmailBody::Text(t) if t == "Body text"));
    }

    #[test]
    fn html_takes_precedence_over_text() {
        let email = Email::builder()
            .from("sender@example.com")
            .to("a@b.com")
            .subject("Test")
            .text("Plain")
            .html("<p>Rich</p>")
            .build()
            .unwrap();

        assert!(matches!(email.body, EmailBody::Html(h) if h == "<p>Rich</p>"));
    }

    #[test]
    fn build_requires_from() {
        let result = Email::builder().to("a@b.com").subject("Hi").text("Body").build();
        assert!(result.is_err());
    }

    #[test]
    fn build_requires_recipient() {
        let result = Email::builder().from("a@b.com").subject("Hi").text("Body").build();
        assert!(result.is_err());
    }

    #[test]
    fn build_requires_body() {
        let result = Email::builder().from("a@b.com").to("a@b.com").subject("Hi").build();
        assert!(result.is_err());
    }

    #[test]
    fn attachment_content_type_from_extension() {
        let pdf = EmailAttachment::from_url("certificate.pdf", "https://cdn.example/c.pdf");
        assert_eq!(pdf.content_type(), "application/pdf");

        let png = EmailAttachment::from_path("badge.PNG", "/tmp/badge.PNG");
        assert_eq!(png.content_type(), "image/png");

        let unknown = EmailAttachment::from_path("artifact", "/tmp/artifact");
        assert_eq!(unknown.content_type(), "application/octet-stream");
    }
}
