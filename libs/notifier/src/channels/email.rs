use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use super::{Notifier, REQUEST_TIMEOUT};
use crate::{Notice, NotificationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS.
    StartTls,
    /// TLS from the first byte (SMTPS).
    ImplicitTls,
}

impl SmtpSecurity {
    pub fn from_mode(mode: Option<&str>) -> Self {
        match mode.map(|m| m.trim().to_ascii_lowercase()) {
            Some(m) if m == "tls" => SmtpSecurity::StartTls,
            _ => SmtpSecurity::ImplicitTls,
        }
    }
}

pub struct EmailChannel {
    host: String,
    port: u16,
    security: SmtpSecurity,
    username: String,
    password: String,
    recipient: String,
}

impl EmailChannel {
    pub fn new(
        host: String,
        port: u16,
        security: SmtpSecurity,
        username: String,
        password: String,
        recipient: String,
    ) -> Self {
        Self {
            host,
            port,
            security,
            username,
            password,
            recipient,
        }
    }

    fn build_message(&self, notice: &Notice) -> Result<Message, NotificationError> {
        Message::builder()
            .from(self.username.parse()?)
            .to(self.recipient.parse()?)
            .subject(notice.title.as_str())
            .header(ContentType::TEXT_HTML)
            .body(notice.body.replace('\n', "<br>"))
            .map_err(|e| NotificationError::Build(e.to_string()))
    }
}

#[async_trait]
impl Notifier for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, notice: &Notice) -> Result<(), NotificationError> {
        let message = self.build_message(notice)?;

        let builder = match self.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?
            }
            SmtpSecurity::ImplicitTls => AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)?,
        };
        let mailer = builder
            .port(self.port)
            .credentials(Credentials::new(
                self.username.clone(),
                self.password.clone(),
            ))
            .timeout(Some(REQUEST_TIMEOUT))
            .build();

        mailer.send(message).await?;
        info!(to = %self.recipient, "notification email sent");
        Ok(())
    }
}
