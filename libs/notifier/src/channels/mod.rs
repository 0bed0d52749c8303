mod bark;
mod email;
mod telegram;
mod webhook;
mod wecom;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};

pub use bark::BarkChannel;
pub use email::{EmailChannel, SmtpSecurity};
pub use telegram::TelegramChannel;
pub use webhook::WebhookChannel;
pub use wecom::WeComChannel;

use crate::{Notice, NotificationError, NotificationSettings, SettingsError};

/// Timeout applied to every outbound notification call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A single delivery channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Key under which this channel's outcome is reported.
    fn name(&self) -> &'static str;

    async fn send(&self, notice: &Notice) -> Result<(), NotificationError>;
}

pub(crate) fn http_client(accept_invalid_certs: bool) -> Result<Client, SettingsError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(SettingsError::HttpClient)
}

/// Builds the enabled channels in delivery order: email, bark, tg, webhook, qywx.
pub(crate) fn from_settings(
    settings: &NotificationSettings,
) -> Result<Vec<Box<dyn Notifier>>, SettingsError> {
    let mut channels: Vec<Box<dyn Notifier>> = Vec::new();
    let client = http_client(false)?;

    if settings.enable_email {
        channels.push(Box::new(EmailChannel::new(
            required("email", "host", &settings.host)?,
            settings.port.ok_or(SettingsError::MissingField {
                channel: "email",
                field: "port",
            })?,
            SmtpSecurity::from_mode(settings.secure.as_deref()),
            required("email", "username", &settings.username)?,
            required("email", "password", &settings.password)?,
            required("email", "email", &settings.email)?,
        )));
    }

    if settings.enable_bark {
        channels.push(Box::new(BarkChannel::new(
            client.clone(),
            required("bark", "barkUrl", &settings.bark_url)?,
        )));
    }

    if settings.enable_tg {
        channels.push(Box::new(TelegramChannel::new(
            client.clone(),
            required("tg", "tgBotToken", &settings.tg_bot_token)?,
            required("tg", "tgChatId", &settings.tg_chat_id)?,
        )));
    }

    if settings.enable_webhook {
        channels.push(Box::new(WebhookChannel::new(
            client.clone(),
            required("webhook", "webhookUrl", &settings.webhook_url)?,
            settings.webhook_id.clone().unwrap_or_default(),
        )));
    }

    if settings.enable_qywx {
        let wecom_client = if settings.qywx_insecure {
            http_client(true)?
        } else {
            client
        };
        channels.push(Box::new(WeComChannel::new(
            wecom_client,
            required("qywx", "baseApiUrl", &settings.base_api_url)?,
            required("qywx", "corpid", &settings.corpid)?,
            required("qywx", "corpsecret", &settings.corpsecret)?,
            required("qywx", "agentid", &settings.agentid)?,
            settings.touser.clone().unwrap_or_else(|| "@all".to_string()),
            settings.pic_url.clone().unwrap_or_default(),
        )));
    }

    Ok(channels)
}

fn required(
    channel: &'static str,
    field: &'static str,
    value: &Option<String>,
) -> Result<String, SettingsError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(SettingsError::MissingField { channel, field })
}

/// Push-style endpoints acknowledge with a plain 200.
pub(crate) fn expect_ok(response: &Response) -> Result<(), NotificationError> {
    let status = response.status();
    if status == reqwest::StatusCode::OK {
        Ok(())
    } else {
        Err(NotificationError::HttpStatus(status.as_u16()))
    }
}
