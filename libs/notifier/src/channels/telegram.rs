use async_trait::async_trait;
use reqwest::Client;

use super::{expect_ok, Notifier};
use crate::{Notice, NotificationError};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

pub struct TelegramChannel {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(client: Client, bot_token: String, chat_id: String) -> Self {
        Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token,
            chat_id,
        }
    }

    /// Points the channel at a different Bot API host (self-hosted or test).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Notifier for TelegramChannel {
    fn name(&self) -> &'static str {
        "tg"
    }

    async fn send(&self, notice: &Notice) -> Result<(), NotificationError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let response = self
            .client
            .get(&url)
            .query(&[("chat_id", self.chat_id.as_str()), ("text", notice.body.as_str())])
            .send()
            .await?;
        expect_ok(&response)
    }
}
