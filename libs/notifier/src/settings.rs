use serde::{Deserialize, Deserializer, Serialize};

use crate::DEFAULT_TITLE;

/// The `Notification` section of the guard configuration file.
///
/// Field names follow the deployed JSON layout, so every channel keeps its
/// enable flag next to flat credential fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    /// Shared notification title
    pub title: Option<String>,

    #[serde(default)]
    pub enable_email: bool,
    /// SMTP server host
    pub host: Option<String>,
    /// SMTP server port
    pub port: Option<u16>,
    /// `"tls"` selects STARTTLS, anything else implicit TLS
    pub secure: Option<String>,
    /// SMTP login, also used as the sender address
    pub username: Option<String>,
    pub password: Option<String>,
    /// Recipient address
    pub email: Option<String>,

    #[serde(default)]
    pub enable_bark: bool,
    pub bark_url: Option<String>,

    #[serde(default, rename = "enableTG")]
    pub enable_tg: bool,
    pub tg_bot_token: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub tg_chat_id: Option<String>,

    #[serde(default)]
    pub enable_webhook: bool,
    pub webhook_url: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub webhook_id: Option<String>,

    #[serde(default)]
    pub enable_qywx: bool,
    pub corpid: Option<String>,
    pub corpsecret: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub agentid: Option<String>,
    pub base_api_url: Option<String>,
    pub touser: Option<String>,
    pub pic_url: Option<String>,
    /// Accept self-signed certificates on the WeCom API proxy
    #[serde(default)]
    pub qywx_insecure: bool,
}

impl NotificationSettings {
    pub fn title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or(DEFAULT_TITLE)
    }

    pub fn any_enabled(&self) -> bool {
        self.enable_email
            || self.enable_bark
            || self.enable_tg
            || self.enable_webhook
            || self.enable_qywx
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
