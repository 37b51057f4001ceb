use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::EmailConfig;
use crate::error::NotifyError;

pub const ALERT_SUBJECT: &str = "Error Notification: YouTube Bot";

pub fn alert_body(count: usize) -> String {
    format!("The bot encountered {count} errors. Please check the logs for details.")
}

/// Where threshold alerts go.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_alert(&self, count: usize) -> Result<(), NotifyError>;
}

/// Sends alerts as a plain-text email over STARTTLS. A new connection is
/// opened for every alert.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    config: EmailConfig,
}

impl SmtpNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn credentials(&self) -> Result<(&str, &str, &str), NotifyError> {
        let sender = self
            .config
            .sender
            .as_deref()
            .ok_or(NotifyError::NotConfigured("EMAIL_SENDER"))?;
        let receiver = self
            .config
            .receiver
            .as_deref()
            .ok_or(NotifyError::NotConfigured("EMAIL_RECEIVER"))?;
        let password = self
            .config
            .password
            .as_deref()
            .ok_or(NotifyError::NotConfigured("EMAIL_PASSWORD"))?;
        Ok((sender, receiver, password))
    }

    pub fn build_message(&self, count: usize) -> Result<Message, NotifyError> {
        let (sender, receiver, _) = self.credentials()?;

        let message = Message::builder()
            .from(sender.parse()?)
            .to(receiver.parse()?)
            .subject(ALERT_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(alert_body(count))?;
        Ok(message)
    }
}

#[async_trait]
impl AlertSink for SmtpNotifier {
    async fn send_alert(&self, count: usize) -> Result<(), NotifyError> {
        let (sender, _, password) = self.credentials()?;
        let message = self.build_message(count)?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(sender.to_string(), password.to_string()))
            .build();

        mailer.send(message).await?;
        info!(error_count = count, "Error notification email sent.");
        Ok(())
    }
}
