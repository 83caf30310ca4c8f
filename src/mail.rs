//! Report mail delivery
//!
//! The orchestrator only sees the [`MailSender`] trait. [`SmtpMailSender`] is the
//! production implementation; tests substitute a recording sender.

use crate::config::{MailConfig, SmtpConfig};
use crate::error::MailError;
use crate::report::EmailBody;
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::debug;

/// SMTP exchange timeout
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A fully assembled report mail
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailMessage {
    /// Recipient address
    pub to: String,
    /// Sender address
    pub from: String,
    /// Subject line
    pub subject: String,
    /// HTML part
    pub html_body: String,
    /// Plain text fallback
    pub text_body: String,
}

impl MailMessage {
    /// Report mail addressed as configured
    pub fn report(config: &MailConfig, body: EmailBody) -> Self {
        Self {
            to: config.to.clone(),
            from: config.from.clone(),
            subject: config.subject.clone(),
            html_body: body.html,
            text_body: body.text,
        }
    }
}

/// Something that can deliver a [`MailMessage`]
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Deliver `message`
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Sends mail through an SMTP relay over implicit TLS
#[derive(Clone, Debug)]
pub struct SmtpMailSender {
    smtp: SmtpConfig,
}

impl SmtpMailSender {
    /// Sender using the given relay settings
    pub fn new(smtp: SmtpConfig) -> Self {
        Self { smtp }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.smtp.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(self.smtp.port)
            .credentials(Credentials::new(
                self.smtp.username.clone(),
                self.smtp.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();
        Ok(transport)
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let email = build_message(message)?;
        let transport = self.transport()?;

        debug!(host = %self.smtp.host, port = self.smtp.port, to = %message.to, "sending report mail");
        transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Assemble a multipart/alternative message (plain text first, then HTML)
pub fn build_message(message: &MailMessage) -> Result<Message, MailError> {
    if message.to.trim().is_empty() {
        return Err(MailError::MissingRecipient);
    }

    let from = parse_mailbox(&message.from)?;
    let to = parse_mailbox(&message.to)?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(message.subject.as_str())
        .multipart(MultiPart::alternative_plain_html(
            message.text_body.clone(),
            message.html_body.clone(),
        ))
        .map_err(|e| MailError::Build(e.to_string()))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| MailError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}
