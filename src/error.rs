use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeskError {
    /// Transport failure: connection refused, reset, TLS, DNS.
    #[error("Network error: {0}")]
    Network(String),

    /// 401 that could not be recovered by a token refresh, or no session.
    #[error("Authorization failed: {0}")]
    Auth(String),

    /// Client-side input rejected before anything was sent.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Version mismatch reported by the server (409).
    #[error("Version conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeskError {
    /// Errors that mean the session is gone and the user has to log in again.
    pub fn is_auth(&self) -> bool {
        matches!(self, DeskError::Auth(_))
    }
}

pub type Result<T> = std::result::Result<T, DeskError>;
