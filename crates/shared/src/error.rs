use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    Unavailable,
    Internal,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            400 | 409 | 422 => ErrorCode::Validation,
            429 => ErrorCode::RateLimited,
            502..=504 => ErrorCode::Unavailable,
            _ => ErrorCode::Internal,
        }
    }
}

/// JSON error body. The review backend usually sends only `message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub message: String,
}

#[derive(Debug, Error)]
#[error("backend returned {status} ({code:?}): {message}")]
pub struct ApiException {
    pub status: u16,
    pub code: ErrorCode,
    pub message: String,
}

impl ApiException {
    /// Error for a non-2xx response. A JSON error body supplies the message
    /// and may refine the code; anything else is kept as raw text.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ApiError>(body).ok();
        let code = parsed
            .as_ref()
            .and_then(|api_error| api_error.code)
            .unwrap_or_else(|| ErrorCode::from_status(status));
        let message = match parsed {
            Some(api_error) => api_error.message,
            None if body.trim().is_empty() => format!("HTTP {status}"),
            None => body.trim().to_string(),
        };
        Self {
            status,
            code,
            message,
        }
    }
}
