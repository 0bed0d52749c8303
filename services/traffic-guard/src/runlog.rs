use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Result of checking one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(rename = "实例ID")]
    pub instance_id: String,
    #[serde(rename = "服务器")]
    pub server: String,
    #[serde(rename = "总流量")]
    pub total_traffic: String,
    #[serde(rename = "已使用流量")]
    pub used_traffic: String,
    #[serde(rename = "使用百分比")]
    pub usage_percentage: String,
    #[serde(rename = "地区")]
    pub region: String,
    #[serde(rename = "实例到期时间")]
    pub expires_at: String,
    #[serde(rename = "公网IP地址")]
    pub public_ip: String,
    #[serde(rename = "使用率达到95%")]
    pub threshold_reached: String,
    #[serde(rename = "安全组状态")]
    pub firewall_status: String,
    #[serde(rename = "通知发送")]
    pub notification: String,
}

/// An account that could not be checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(rename = "服务器")]
    pub server: String,
    #[serde(rename = "实例ID")]
    pub instance_id: String,
    #[serde(rename = "错误信息")]
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogRecord {
    Account(AccountRecord),
    Error(ErrorRecord),
}

/// Records of one run, written once when the run ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLog {
    #[serde(rename = "获取时间")]
    pub retrieved_at: String,
    #[serde(rename = "日志")]
    pub records: Vec<LogRecord>,
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            retrieved_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: LogRecord) {
        self.records.push(record);
    }

    pub fn account_records(&self) -> impl Iterator<Item = &AccountRecord> {
        self.records.iter().filter_map(|record| match record {
            LogRecord::Account(account) => Some(account),
            LogRecord::Error(_) => None,
        })
    }

    pub fn error_records(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records.iter().filter_map(|record| match record {
            LogRecord::Error(error) => Some(error),
            LogRecord::Account(_) => None,
        })
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize run log")
    }

    /// Replaces `path` with this log and returns the written JSON.
    pub fn write_to(&self, path: &Path) -> Result<String> {
        let json = self.to_pretty_json()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log directory: {}", parent.display()))?;
        }
        fs::write(path, &json)
            .with_context(|| format!("failed to write run log: {}", path.display()))?;

        info!(path = %path.display(), records = self.records.len(), "run log written");
        Ok(json)
    }
}
