//! REST client error types.

use thiserror::Error;

use crate::token::TokenStoreError;

/// Result type for REST operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure, timeout or undecodable body.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the session. The stored token has been cleared.
    #[error("Session expired, please log in again")]
    Unauthorized,

    /// Any other non-2xx response.
    #[error("{message} ({status})")]
    Status { status: u16, message: String },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// Rejected before sending.
    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Token store error: {0}")]
    Token(#[from] TokenStoreError),
}

impl ApiError {
    /// HTTP status, if the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
