use tracing::{info, info_span, Instrument};

use super::{instance_details, Guard, InstanceDetails, QUERY_FAILED};
use crate::config::Account;
use crate::error::GuardError;
use crate::firewall::{self, Action};
use crate::gate;
use crate::regions::region_name;
use crate::report::{format_decimal, format_quota, Report};
use crate::runlog::{AccountRecord, LogRecord, RunLog};
use crate::usage::{self, Usage};

const NOT_REQUIRED: &str = "不需要";

impl Guard<'_> {
    /// Enforces the traffic threshold on every account and collects the log.
    pub async fn run_check(&self) -> RunLog {
        let mut log = RunLog::new();

        for account in &self.config.accounts {
            let span = info_span!(
                "check",
                account = %account.display_name(),
                instance_id = %account.instance_id
            );
            let record = match self.check_account(account).instrument(span).await {
                Ok(record) => LogRecord::Account(record),
                Err(err) => LogRecord::Error(self.report_error(account, &err).await),
            };
            log.push(record);
        }

        info!(
            accounts = self.config.accounts.len(),
            errors = log.error_records().count(),
            "check run finished"
        );
        log
    }

    async fn check_account(&self, account: &Account) -> Result<AccountRecord, GuardError> {
        gate::validate_account(self.cloud, account).await?;

        let credentials = account.credentials();
        let region_id = account.region_id.as_str();
        let instance_id = account.instance_id.as_str();

        let reading = usage::read_traffic(self.cloud, &credentials).await;
        let usage = usage::evaluate(&reading, account.max_traffic, region_id)?;

        let security_group_id = self
            .cloud
            .security_group_id(&credentials, region_id, instance_id)
            .await?;
        let details = instance_details(self.cloud, &credentials, region_id, instance_id).await;

        let state =
            firewall::observe(self.cloud, &credentials, region_id, &security_group_id).await;
        let action = firewall::plan(state, &usage);
        firewall::apply(self.cloud, &credentials, region_id, &security_group_id, action).await?;

        let status = match action {
            Action::None => firewall::unchanged_status(state, &usage),
            _ => action.applied_status(),
        };
        let mut record = account_record(account, &usage, &details, status);

        record.notification = if action == Action::None {
            NOT_REQUIRED.to_string()
        } else {
            self.notify(Report::Alert(&record)).await.to_string()
        };

        info!(
            usage = %record.usage_percentage,
            ?state,
            ?action,
            "account checked"
        );
        Ok(record)
    }
}

fn account_record(
    account: &Account,
    usage: &Usage,
    details: &InstanceDetails,
    status: &str,
) -> AccountRecord {
    let (used_traffic, usage_percentage, threshold_reached) = match usage.snapshot() {
        Some(snapshot) => (
            format!("{}GB", format_decimal(snapshot.traffic_gb)),
            format!("{}%", format_decimal(snapshot.usage_percentage)),
            if firewall::over_threshold(snapshot.usage_percentage) {
                "是"
            } else {
                "否"
            },
        ),
        None => (QUERY_FAILED.to_string(), QUERY_FAILED.to_string(), "未知"),
    };

    AccountRecord {
        instance_id: account.instance_id.clone(),
        server: account.display_name(),
        total_traffic: format!("{}GB", format_quota(account.max_traffic)),
        used_traffic,
        usage_percentage,
        region: region_name(&account.region_id).to_string(),
        expires_at: details.expires_at.clone(),
        public_ip: details.public_ip.clone(),
        threshold_reached: threshold_reached.to_string(),
        firewall_status: status.to_string(),
        notification: String::new(),
    }
}
