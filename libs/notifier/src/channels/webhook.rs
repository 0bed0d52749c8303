use async_trait::async_trait;
use reqwest::Client;

use super::{expect_ok, Notifier};
use crate::{Notice, NotificationError};

/// Generic GET webhook carrying `id`, `title` and `content` query parameters.
pub struct WebhookChannel {
    client: Client,
    url: String,
    webhook_id: String,
}

impl WebhookChannel {
    pub fn new(client: Client, url: String, webhook_id: String) -> Self {
        Self {
            client,
            url,
            webhook_id,
        }
    }

    fn request_url(&self, notice: &Notice) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}id={}&title={}&content={}",
            self.url,
            separator,
            urlencoding::encode(&self.webhook_id),
            urlencoding::encode(notice.headline_or_title()),
            urlencoding::encode(&notice.body)
        )
    }
}

#[async_trait]
impl Notifier for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, notice: &Notice) -> Result<(), NotificationError> {
        let response = self.client.get(self.request_url(notice)).send().await?;
        expect_ok(&response)
    }
}
