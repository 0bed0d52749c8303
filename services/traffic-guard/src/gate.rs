use tracing::debug;

use crate::cloud::CloudApi;
use crate::config::Account;
use crate::error::GuardError;

/// Checks that the account's credentials work in its region and that the
/// configured instance is visible to them.
pub async fn validate_account(cloud: &dyn CloudApi, account: &Account) -> Result<(), GuardError> {
    let instances = cloud
        .describe_instances(&account.credentials(), &account.region_id)
        .await?;

    if instances
        .iter()
        .any(|instance| instance.instance_id == account.instance_id)
    {
        debug!(instance_id = %account.instance_id, "instance validated");
        Ok(())
    } else {
        Err(GuardError::InstanceNotFound {
            instance_id: account.instance_id.clone(),
            region_id: account.region_id.clone(),
        })
    }
}
