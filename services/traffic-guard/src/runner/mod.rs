//! The `check` and `digest` runs over all configured accounts.

mod check;
mod digest;

pub use digest::DigestSummary;

use cdt_notifier::{FanoutReport, NotificationFanout};
use tracing::{error, warn};

use crate::cloud::{CloudApi, Credentials};
use crate::config::{Account, GuardConfig};
use crate::error::GuardError;
use crate::report::Report;
use crate::runlog::ErrorRecord;

pub const NO_EXPIRY: &str = "无到期时间";
pub const NO_PUBLIC_IP: &str = "无公网 IP 地址";
pub const QUERY_FAILED: &str = "查询失败";

/// Shared state of one run. Accounts are processed one at a time.
pub struct Guard<'a> {
    config: &'a GuardConfig,
    cloud: &'a dyn CloudApi,
    fanout: &'a NotificationFanout,
}

impl<'a> Guard<'a> {
    pub fn new(
        config: &'a GuardConfig,
        cloud: &'a dyn CloudApi,
        fanout: &'a NotificationFanout,
    ) -> Self {
        Self {
            config,
            cloud,
            fanout,
        }
    }

    fn title(&self) -> &str {
        self.config.title()
    }

    async fn notify(&self, report: Report<'_>) -> FanoutReport {
        self.fanout.notify(&report.notice(self.title())).await
    }

    /// Sends the error notice for `account` and returns its log record.
    async fn report_error(&self, account: &Account, err: &GuardError) -> ErrorRecord {
        error!(
            account = %account.display_name(),
            instance_id = %account.instance_id,
            error = %err,
            "account skipped"
        );

        let record = ErrorRecord {
            server: account.display_name(),
            instance_id: account.instance_id.clone(),
            error: err.to_string(),
        };
        self.notify(Report::Error(&record)).await;
        record
    }
}

/// Expiry and address shown in reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDetails {
    pub expires_at: String,
    pub public_ip: String,
}

impl InstanceDetails {
    fn unavailable() -> Self {
        Self {
            expires_at: QUERY_FAILED.to_string(),
            public_ip: QUERY_FAILED.to_string(),
        }
    }
}

pub async fn instance_details(
    cloud: &dyn CloudApi,
    credentials: &Credentials,
    region_id: &str,
    instance_id: &str,
) -> InstanceDetails {
    match cloud
        .describe_instance(credentials, region_id, instance_id)
        .await
    {
        Ok(Some(instance)) => InstanceDetails {
            expires_at: instance
                .expired_time
                .as_deref()
                .filter(|t| !t.is_empty())
                .unwrap_or(NO_EXPIRY)
                .to_string(),
            public_ip: instance.public_ip().unwrap_or(NO_PUBLIC_IP).to_string(),
        },
        Ok(None) => {
            warn!(instance_id, "instance details missing");
            InstanceDetails::unavailable()
        }
        Err(err) => {
            warn!(instance_id, error = %err, "instance details query failed");
            InstanceDetails::unavailable()
        }
    }
}
