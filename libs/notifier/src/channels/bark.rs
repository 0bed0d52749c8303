use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{expect_ok, Notifier};
use crate::{Notice, NotificationError};

/// Group title shown by the Bark app.
const BARK_TITLE: &str = "流量告警";

pub struct BarkChannel {
    client: Client,
    base_url: String,
}

impl BarkChannel {
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn push_url(&self, body: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            urlencoding::encode(BARK_TITLE),
            urlencoding::encode(body)
        )
    }
}

#[async_trait]
impl Notifier for BarkChannel {
    fn name(&self) -> &'static str {
        "bark"
    }

    async fn send(&self, notice: &Notice) -> Result<(), NotificationError> {
        let response = self.client.get(self.push_url(&notice.body)).send().await?;
        expect_ok(&response)?;
        debug!("bark push accepted");
        Ok(())
    }
}
