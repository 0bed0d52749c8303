use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::Notifier;
use crate::{Notice, NotificationError};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// Enterprise WeChat application message.
///
/// Delivery is two calls: a short-lived access token is fetched with the
/// corp credentials, then a `news` card is posted referencing that token.
pub struct WeComChannel {
    client: Client,
    base_url: String,
    corp_id: String,
    corp_secret: String,
    agent_id: String,
    to_user: String,
    pic_url: String,
}

impl WeComChannel {
    pub fn new(
        client: Client,
        base_url: String,
        corp_id: String,
        corp_secret: String,
        agent_id: String,
        to_user: String,
        pic_url: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            corp_id,
            corp_secret,
            agent_id,
            to_user,
            pic_url,
        }
    }

    async fn access_token(&self) -> Result<String, NotificationError> {
        let url = format!("{}/cgi-bin/gettoken", self.base_url);
        let response: TokenResponse = self
            .client
            .get(&url)
            .query(&[
                ("corpid", self.corp_id.as_str()),
                ("corpsecret", self.corp_secret.as_str()),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| NotificationError::InvalidResponse(e.to_string()))?;

        if response.errcode != 0 {
            return Err(NotificationError::Rejected {
                code: response.errcode,
                message: response.errmsg,
            });
        }
        response
            .access_token
            .ok_or_else(|| NotificationError::InvalidResponse("missing access_token".into()))
    }

    fn payload(&self, notice: &Notice) -> Value {
        // Numeric agent ids are sent as numbers.
        let agent_id = self
            .agent_id
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::from(self.agent_id.clone()));

        json!({
            "touser": self.to_user,
            "msgtype": "news",
            "agentid": agent_id,
            "news": {
                "articles": [{
                    "title": notice.headline_or_title(),
                    "description": notice.body,
                    "url": "",
                    "picurl": self.pic_url,
                }]
            },
            "enable_id_trans": 0,
            "enable_duplicate_check": 0,
            "duplicate_check_interval": 1800,
        })
    }
}

#[async_trait]
impl Notifier for WeComChannel {
    fn name(&self) -> &'static str {
        "qywx"
    }

    async fn send(&self, notice: &Notice) -> Result<(), NotificationError> {
        let token = self.access_token().await?;
        debug!("obtained wecom access token");

        let url = format!("{}/cgi-bin/message/send", self.base_url);
        let response: SendResponse = self
            .client
            .post(&url)
            .query(&[("access_token", token.as_str())])
            .json(&self.payload(notice))
            .send()
            .await?
            .json()
            .await
            .map_err(|e| NotificationError::InvalidResponse(e.to_string()))?;

        if response.errcode == 0 {
            Ok(())
        } else {
            Err(NotificationError::Rejected {
                code: response.errcode,
                message: response.errmsg,
            })
        }
    }
}
