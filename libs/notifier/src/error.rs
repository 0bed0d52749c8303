use thiserror::Error;

/// Failure of a single channel delivery attempt.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("channel returned HTTP {0}")]
    HttpStatus(u16),

    #[error("channel rejected message (errcode {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("invalid response from channel: {0}")]
    InvalidResponse(String),

    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("email build error: {0}")]
    Build(String),
}

/// Channel settings that cannot produce a working channel.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("channel '{channel}' is enabled but '{field}' is not configured")]
    MissingField {
        channel: &'static str,
        field: &'static str,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
