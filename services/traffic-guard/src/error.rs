use thiserror::Error;

use crate::cloud::CloudError;

/// Account-scoped failures of a guard run.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("credential rejected: {0}")]
    Credential(String),

    #[error("instance {instance_id} not found in region {region_id}")]
    InstanceNotFound {
        instance_id: String,
        region_id: String,
    },

    #[error("remote call failed: {0}")]
    RemoteCall(#[source] CloudError),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<CloudError> for GuardError {
    fn from(err: CloudError) -> Self {
        if err.is_credential_error() {
            GuardError::Credential(err.to_string())
        } else {
            GuardError::RemoteCall(err)
        }
    }
}
