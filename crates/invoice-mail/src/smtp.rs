//! SMTP Notifier

use std::time::Duration;

use async_trait::async_trait;
use invoice_core::{Notification, Notifier};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::error::MailError;

/// How the connection to the relay is secured
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmtpTls {
    /// Implicit TLS (SMTPS), the Gmail default on port 465
    Wrapper,
    /// Plain connection upgraded with STARTTLS
    StartTls,
    /// No encryption, for local relays only
    None,
}

impl SmtpTls {
    fn parse(value: &str) -> Result<Self, MailError> {
        match value.to_lowercase().as_str() {
            "tls" | "ssl" | "smtps" => Ok(Self::Wrapper),
            "starttls" => Ok(Self::StartTls),
            "none" | "plain" => Ok(Self::None),
            other => Err(MailError::MissingConfig(format!(
                "SMTP_TLS must be tls, starttls or none (got '{other}')"
            ))),
        }
    }

    const fn default_port(self) -> u16 {
        match self {
            Self::Wrapper => 465,
            Self::StartTls => 587,
            Self::None => 25,
        }
    }
}

/// SMTP relay settings
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub tls: SmtpTls,
    pub username: String,
    pub password: String,
    pub from: String,
    pub timeout: Duration,
}

impl SmtpConfig {
    /// Read settings through `lookup`, which maps variable names to values.
    /// `Ok(None)` when `EMAIL_USER` is unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, MailError> {
        let Some(username) = lookup("EMAIL_USER").filter(|u| !u.is_empty()) else {
            return Ok(None);
        };
        let password = lookup("EMAIL_PASS")
            .ok_or_else(|| MailError::MissingConfig("EMAIL_PASS".into()))?;

        let tls = lookup("SMTP_TLS")
            .map(|v| SmtpTls::parse(&v))
            .transpose()?
            .unwrap_or(SmtpTls::Wrapper);

        let port = match lookup("SMTP_PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| MailError::MissingConfig(format!("SMTP_PORT is not a port: '{p}'")))?,
            None => tls.default_port(),
        };

        Ok(Some(Self {
            host: lookup("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".into()),
            port,
            tls,
            from: lookup("EMAIL_FROM").unwrap_or_else(|| username.clone()),
            username,
            password,
            timeout: Duration::from_secs(10),
        }))
    }

    /// Override the transport timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|e| MailError::InvalidAddress(format!("{address}: {e}")))
}

/// Sends notifications through an SMTP relay
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = match config.tls {
            SmtpTls::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| MailError::Smtp(e.to_string()))?,
            SmtpTls::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MailError::Smtp(e.to_string()))?,
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(config.timeout))
            .build();

        Ok(Self {
            transport,
            from: mailbox(&config.from)?,
        })
    }

    /// Build the plain-text message for a notification
    pub fn build_message(&self, notification: &Notification) -> Result<Message, MailError> {
        Message::builder()
            .from(self.from.clone())
            .to(mailbox(&notification.to)?)
            .subject(notification.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body())
            .map_err(|e| MailError::Build(e.to_string()))
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), MailError> {
        let message = self.build_message(notification)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Smtp(e.to_string()))?;

        tracing::info!(
            to = %notification.to,
            kind = ?notification.kind,
            "Email sent"
        );
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, notification: &Notification) -> invoice_core::Result<()> {
        Ok(self.deliver(notification).await?)
    }

    fn name(&self) -> &str {
        "smtp"
    }
}

/// Writes notifications to the log instead of sending them
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> invoice_core::Result<()> {
        tracing::info!(
            to = %notification.to,
            subject = notification.subject(),
            payment_url = %notification.payment_url,
            "Email delivery disabled, logging notification"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
