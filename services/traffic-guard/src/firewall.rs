use tracing::{info, warn};

use crate::cloud::{CloudApi, Credentials, SecurityGroupPermission, PUBLIC_CIDR};
use crate::error::GuardError;
use crate::usage::Usage;

/// Usage percentage at which public access is cut.
pub const USAGE_THRESHOLD: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirewallRuleState {
    Enabled,
    Disabled,
    /// The security group could not be read.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Disable,
    Enable,
}

impl Action {
    /// Status text recorded after the action was applied.
    pub fn applied_status(self) -> &'static str {
        match self {
            Action::Disable => "已禁用 0.0.0.0/0 访问规则",
            Action::Enable => "已恢复 0.0.0.0/0 访问规则",
            Action::None => "无需操作",
        }
    }
}

pub fn over_threshold(usage_percentage: f64) -> bool {
    usage_percentage >= USAGE_THRESHOLD
}

/// Decides the transition for an observed rule and a measured usage.
pub fn reconcile(observed_enabled: bool, usage_percentage: f64) -> Action {
    match (over_threshold(usage_percentage), observed_enabled) {
        (true, true) => Action::Disable,
        (false, false) => Action::Enable,
        _ => Action::None,
    }
}

/// Like [`reconcile`], but nothing changes while either input is unknown.
pub fn plan(state: FirewallRuleState, usage: &Usage) -> Action {
    let Some(snapshot) = usage.snapshot() else {
        return Action::None;
    };
    match state {
        FirewallRuleState::Enabled => reconcile(true, snapshot.usage_percentage),
        FirewallRuleState::Disabled => reconcile(false, snapshot.usage_percentage),
        FirewallRuleState::Unknown => Action::None,
    }
}

/// Status text for a run that left the rule untouched.
pub fn unchanged_status(state: FirewallRuleState, usage: &Usage) -> &'static str {
    match (state, usage) {
        (_, Usage::Unknown { .. }) => "流量查询失败，未执行操作",
        (FirewallRuleState::Unknown, _) => "安全组规则查询失败，未执行操作",
        (FirewallRuleState::Disabled, _) => "规则已禁用，无需操作",
        (FirewallRuleState::Enabled, _) => "规则已启用，无需操作",
    }
}

/// The allow-all intranet ingress rule for 0.0.0.0/0.
pub fn is_public_ingress_rule(rule: &SecurityGroupPermission) -> bool {
    rule.ip_protocol.eq_ignore_ascii_case("all")
        && rule.source_cidr_ip == PUBLIC_CIDR
        && rule.policy.eq_ignore_ascii_case("accept")
        && rule.nic_type == "intranet"
        && rule.direction == "ingress"
}

pub fn rule_state(permissions: &[SecurityGroupPermission]) -> FirewallRuleState {
    if permissions.iter().any(is_public_ingress_rule) {
        FirewallRuleState::Enabled
    } else {
        FirewallRuleState::Disabled
    }
}

pub async fn observe(
    cloud: &dyn CloudApi,
    credentials: &Credentials,
    region_id: &str,
    security_group_id: &str,
) -> FirewallRuleState {
    match cloud
        .security_group_permissions(credentials, region_id, security_group_id)
        .await
    {
        Ok(permissions) => rule_state(&permissions),
        Err(err) => {
            warn!(
                security_group_id,
                error = %err,
                "security group query failed, rule state unknown"
            );
            FirewallRuleState::Unknown
        }
    }
}

/// Issues the single mutating call for `action`, if any.
pub async fn apply(
    cloud: &dyn CloudApi,
    credentials: &Credentials,
    region_id: &str,
    security_group_id: &str,
    action: Action,
) -> Result<(), GuardError> {
    match action {
        Action::None => return Ok(()),
        Action::Disable => {
            cloud
                .revoke_public_ingress(credentials, region_id, security_group_id)
                .await?
        }
        Action::Enable => {
            cloud
                .authorize_public_ingress(credentials, region_id, security_group_id)
                .await?
        }
    }
    info!(security_group_id, ?action, "firewall rule updated");
    Ok(())
}
