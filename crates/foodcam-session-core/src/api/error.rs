use reqwest::StatusCode;
use thiserror::Error;

use super::refresh::RefreshFailure;
use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Login rejected: {0}")]
    LoginRejected(String),

    /// The session could not be refreshed; `source` is the failure that triggered the attempt
    #[error("Session expired ({reason}): {source}")]
    RefreshRejected {
        reason: RefreshFailure,
        #[source]
        source: Box<ApiError>,
    },

    #[error("Still unauthorized after token refresh (status {0})")]
    RetryExhausted(StatusCode),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Transport failure with no response at all
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::NetworkError(_))
    }

    /// The user must log in again
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::RefreshRejected { .. } | ApiError::RetryExhausted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(ApiError::from_status(StatusCode::UNAUTHORIZED, ""), ApiError::Unauthorized));
        assert!(matches!(ApiError::from_status(StatusCode::FORBIDDEN, "no"), ApiError::AccessDenied(b) if b == "no"));
        assert!(matches!(ApiError::from_status(StatusCode::BAD_GATEWAY, ""), ApiError::ServerError(_)));
        assert!(matches!(ApiError::from_status(StatusCode::BAD_REQUEST, ""), ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(400);
        let truncated = ApiError::truncate_body(&body);
        assert!(truncated.contains("truncated, 800 total bytes"));
    }

    #[test]
    fn test_session_expired_classification() {
        let err = ApiError::RefreshRejected {
            reason: RefreshFailure::NoRefreshToken,
            source: Box::new(ApiError::Unauthorized),
        };
        assert!(err.is_session_expired());
        assert!(!ApiError::Unauthorized.is_session_expired());
        assert!(ApiError::RetryExhausted(StatusCode::UNAUTHORIZED).is_session_expired());
    }
}
