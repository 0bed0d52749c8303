use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("{action} returned {code} (HTTP {status}): {message}")]
    Api {
        action: &'static str,
        status: u16,
        code: String,
        message: String,
    },

    #[error("{action} request failed: {source}")]
    Transport {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid {action} response: {reason}")]
    InvalidResponse { action: &'static str, reason: String },

    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl CloudError {
    /// True when the provider rejected the access key pair itself.
    pub fn is_credential_error(&self) -> bool {
        match self {
            CloudError::Api { status, code, .. } => {
                *status == 401
                    || code.starts_with("InvalidAccessKeyId")
                    || code.starts_with("InvalidAccessKeySecret")
                    || code.starts_with("Forbidden.AccessKey")
                    || code == "SignatureDoesNotMatch"
                    || code == "IncompleteSignature"
            }
            _ => false,
        }
    }
}
