//! Errors raised by the backend client

/// Remediation text shown when the backend cannot be reached at all.
pub const NETWORK_HINT: &str = "Check that the backend is running, that PROPDESK_API_URL points at it, \
and that this device can reach that host (same network or VPN).";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The backend answered with a non-2xx status.
    #[error("{method} {path} failed (HTTP {status}): {body}")]
    Http {
        status: u16,
        method: String,
        path: String,
        body: String,
    },

    /// The request never got a response (DNS, refused, TLS, reset...).
    #[error("Could not reach the backend at {url} ({reason}). {hint}")]
    Network {
        url: String,
        reason: String,
        hint: &'static str,
    },

    /// The backend answered 2xx with a body we could not decode.
    #[error("Unexpected response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Invalid backend URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
