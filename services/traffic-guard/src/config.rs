use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cdt_notifier::NotificationSettings;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cloud::{CloudEndpoints, Credentials};

/// One monitored account and its instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Display name used in notifications
    #[serde(default)]
    pub account_name: Option<String>,

    #[serde(rename = "AccessKeyId")]
    pub access_key_id: String,

    #[serde(rename = "AccessKeySecret")]
    pub access_key_secret: String,

    pub region_id: String,

    pub instance_id: String,

    /// Traffic quota in GB
    pub max_traffic: f64,

    /// Include this account in the daily digest
    #[serde(default = "default_true")]
    pub enable_notification: bool,

    /// Only notify when the firewall rule is toggled (no digest)
    #[serde(default)]
    pub only_notify_on_toggle: bool,
}

fn default_true() -> bool {
    true
}

impl Account {
    pub fn display_name(&self) -> String {
        match self.account_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                let prefix: String = self.access_key_id.chars().take(7).collect();
                format!("{prefix}***")
            }
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            access_key_id: self.access_key_id.clone(),
            access_key_secret: self.access_key_secret.clone(),
        }
    }
}

/// Guard configuration, loaded once per run and passed by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(rename = "Accounts", default)]
    pub accounts: Vec<Account>,

    #[serde(rename = "Notification", default)]
    pub notification: NotificationSettings,

    #[serde(rename = "Endpoints", default)]
    pub endpoints: CloudEndpoints,
}

impl GuardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = Self::from_json(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;

        info!(
            path = %path.display(),
            accounts = config.accounts.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks only; per-account quota problems are reported per
    /// account at run time.
    pub fn validate(&self) -> Result<()> {
        if self.accounts.is_empty() {
            warn!("no accounts configured");
        }

        for (index, account) in self.accounts.iter().enumerate() {
            if account.access_key_id.trim().is_empty() {
                anyhow::bail!("Accounts[{index}].AccessKeyId cannot be empty");
            }
            if account.access_key_secret.trim().is_empty() {
                anyhow::bail!("Accounts[{index}].AccessKeySecret cannot be empty");
            }
            if account.region_id.trim().is_empty() {
                anyhow::bail!("Accounts[{index}].regionId cannot be empty");
            }
            if account.instance_id.trim().is_empty() {
                anyhow::bail!("Accounts[{index}].instanceId cannot be empty");
            }
        }

        if !self.notification.any_enabled() {
            warn!("no notification channel enabled");
        }

        Ok(())
    }

    pub fn title(&self) -> &str {
        self.notification.title()
    }
}
