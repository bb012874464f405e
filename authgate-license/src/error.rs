//! Error types for the licensing client.

use thiserror::Error;

/// Licensing client errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// An authenticating call was made before `initialize()` succeeded.
    #[error("KeyAuth not initialized")]
    NotInitialized,

    /// Transport failure or a non-200 HTTP status.
    #[error("network error: {0}")]
    Network(String),

    /// Response body is not JSON or lacks required fields.
    #[error("invalid response: {0}")]
    Decode(String),

    /// Well-formed response with `success=false`.
    #[error("rejected by server: {0}")]
    Rejected(String),

    /// Configuration is missing or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The background session worker has stopped.
    #[error("session worker stopped")]
    WorkerClosed,
}

impl LicenseError {
    /// Returns the text shown to the user for this failure.
    ///
    /// Server rejections are passed through verbatim; every other kind
    /// uses its display form.
    #[must_use]
    pub fn into_message(self) -> String {
        match self {
            Self::Rejected(msg) => msg,
            other => other.to_string(),
        }
    }

    /// Returns true for transport failures and non-200 statuses.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns true when the server response could not be decoded.
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    /// Returns true when the server answered `success=false`.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

impl From<serde_json::Error> for LicenseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for LicenseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("request timed out: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Result type for licensing operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
