use tracing::{debug, info, info_span, warn, Instrument};

use super::{instance_details, Guard};
use crate::config::Account;
use crate::error::GuardError;
use crate::firewall::{self, FirewallRuleState};
use crate::gate;
use crate::report::{DigestView, Report};
use crate::usage::{self, Usage};

/// Counts of one digest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigestSummary {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum DigestOutcome {
    Sent,
    Skipped(&'static str),
    Undelivered,
}

impl Guard<'_> {
    /// Sends the usage digest for every opted-in account. Never mutates.
    pub async fn run_digest(&self) -> DigestSummary {
        let mut summary = DigestSummary::default();

        for account in &self.config.accounts {
            if !account.enable_notification || account.only_notify_on_toggle {
                debug!(account = %account.display_name(), "digest disabled for account");
                summary.skipped += 1;
                continue;
            }

            let span = info_span!(
                "digest",
                account = %account.display_name(),
                instance_id = %account.instance_id
            );
            match self.digest_account(account).instrument(span).await {
                Ok(DigestOutcome::Sent) => summary.sent += 1,
                Ok(DigestOutcome::Skipped(reason)) => {
                    info!(account = %account.display_name(), reason, "digest skipped");
                    summary.skipped += 1;
                }
                Ok(DigestOutcome::Undelivered) => summary.failed += 1,
                Err(err) => {
                    self.report_error(account, &err).await;
                    summary.failed += 1;
                }
            }
        }

        info!(
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "digest run finished"
        );
        summary
    }

    async fn digest_account(&self, account: &Account) -> Result<DigestOutcome, GuardError> {
        gate::validate_account(self.cloud, account).await?;

        let credentials = account.credentials();
        let region_id = account.region_id.as_str();
        let instance_id = account.instance_id.as_str();

        let reading = usage::read_traffic(self.cloud, &credentials).await;
        let usage = usage::evaluate(&reading, account.max_traffic, region_id)?;
        let snapshot = match &usage {
            Usage::Measured(snapshot) => snapshot,
            Usage::Unknown { reason } => {
                warn!(reason = %reason, "usage unknown, no digest");
                return Ok(DigestOutcome::Skipped("usage unknown"));
            }
        };

        let security_group_id = self
            .cloud
            .security_group_id(&credentials, region_id, instance_id)
            .await?;
        let state =
            firewall::observe(self.cloud, &credentials, region_id, &security_group_id).await;
        if state != FirewallRuleState::Enabled {
            return Ok(DigestOutcome::Skipped("firewall rule not enabled"));
        }

        let details = instance_details(self.cloud, &credentials, region_id, instance_id).await;
        let server = account.display_name();
        let report = self
            .notify(Report::Digest(DigestView {
                server: &server,
                public_ip: &details.public_ip,
                instance_id,
                expires_at: &details.expires_at,
                max_traffic: account.max_traffic,
                usage: snapshot,
            }))
            .await;

        Ok(if report.is_success() {
            DigestOutcome::Sent
        } else {
            DigestOutcome::Undelivered
        })
    }
}
