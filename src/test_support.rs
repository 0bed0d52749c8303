//! Fixtures shared by the end-to-end suite.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use cdt_notifier::NotificationFanout;
use cdt_traffic_guard::{AliyunClient, DigestSummary, Guard, GuardConfig, RunLog};
use serde_json::{json, Value};
use tempfile::TempDir;

pub use cdt_notifier;
pub use cdt_traffic_guard;

pub const GB: u64 = 1024 * 1024 * 1024;

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn account_json(name: &str, instance_id: &str, max_traffic: f64) -> Value {
    json!({
        "accountName": name,
        "AccessKeyId": "LTAI5tE2eTest",
        "AccessKeySecret": "e2e-secret",
        "regionId": "cn-hongkong",
        "instanceId": instance_id,
        "maxTraffic": max_traffic
    })
}

/// Config pointing both cloud endpoints at `cloud_uri`.
pub fn config_json(accounts: Vec<Value>, cloud_uri: &str, notification: Value) -> Value {
    json!({
        "Accounts": accounts,
        "Notification": notification,
        "Endpoints": { "cdt": cloud_uri, "ecs": cloud_uri }
    })
}

pub fn bark_notification(bark_uri: &str) -> Value {
    json!({ "enableBark": true, "barkUrl": format!("{bark_uri}/device-key") })
}

pub fn webhook_notification(webhook_uri: &str) -> Value {
    json!({
        "enableWebhook": true,
        "webhookUrl": format!("{webhook_uri}/hook?token=e2e"),
        "webhookId": 7
    })
}

/// A config file and run-log path inside a scratch directory.
pub struct GuardFixture {
    _dir: TempDir,
    pub config_path: PathBuf,
    pub log_path: PathBuf,
}

impl GuardFixture {
    pub fn new(config: &Value) -> Result<Self> {
        let dir = TempDir::new().context("creating fixture tempdir")?;
        let config_path = dir.path().join("config.json");
        let log_path = dir.path().join("logs").join("data.json");
        fs::write(&config_path, serde_json::to_vec_pretty(config)?)
            .context("writing fixture config")?;
        Ok(Self {
            _dir: dir,
            config_path,
            log_path,
        })
    }

    fn load(&self) -> Result<(GuardConfig, NotificationFanout, AliyunClient)> {
        let config = GuardConfig::load(&self.config_path)?;
        let fanout = NotificationFanout::from_settings(&config.notification)?;
        let cloud = AliyunClient::with_timeout(config.endpoints.clone(), 5)?;
        Ok((config, fanout, cloud))
    }

    /// Runs `check` the way the binary does, including the log write.
    pub async fn run_check(&self) -> Result<RunLog> {
        let (config, fanout, cloud) = self.load()?;
        let log = Guard::new(&config, &cloud, &fanout).run_check().await;
        log.write_to(&self.log_path)?;
        Ok(log)
    }

    pub async fn run_digest(&self) -> Result<DigestSummary> {
        let (config, fanout, cloud) = self.load()?;
        Ok(Guard::new(&config, &cloud, &fanout).run_digest().await)
    }

    pub fn read_log(&self) -> Result<Value> {
        let contents = fs::read_to_string(&self.log_path).context("reading run log")?;
        Ok(serde_json::from_str(&contents)?)
    }
}
