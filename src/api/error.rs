use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by the Atera client.
///
/// Per-field defects in a device record never show up here; the normalizer
/// degrades those to `None` instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API key not set")]
    CredentialMissing,

    /// 401 from upstream.
    #[error("Invalid API key. Please check your credentials.")]
    CredentialInvalid,

    /// 429 or 5xx, still failing after the retry budget was spent.
    #[error("Upstream unavailable (HTTP {status})")]
    TransientUpstream { status: u16 },

    #[error("Request timeout after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Device not found or already deleted")]
    NotFound,

    #[error("Access denied - insufficient permissions")]
    Forbidden,

    #[error("Delete operation not allowed - device may have dependencies")]
    Conflict,

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response body: {message}")]
    Decode { message: String },
}

impl ApiError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => Self::CredentialInvalid,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            405 | 409 => Self::Conflict,
            429 | 500..=599 => Self::TransientUpstream {
                status: status.as_u16(),
            },
            code => {
                let message = if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("Unknown").to_string()
                } else {
                    body.trim().to_string()
                };
                Self::Status {
                    status: code,
                    message,
                }
            }
        }
    }

    /// Worth another attempt under the backoff policy.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TransientUpstream { .. } | Self::Timeout { .. } => true,
            Self::Transport(e) => e.is_connect(),
            _ => false,
        }
    }

    /// The stored credential can no longer be used and must be re-entered.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Self::CredentialInvalid | Self::CredentialMissing)
    }
}
