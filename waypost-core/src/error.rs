//! Error taxonomy for Waypost

use thiserror::Error;

/// Classified failures. Every storage or crypto outcome is mapped to one of
/// these before it crosses a crate boundary.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status code this failure maps to.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => 422,
            ApiError::NotFound(_) => 404,
            ApiError::Forbidden(_) => 403,
            ApiError::Unauthorized(_) => 401,
            ApiError::Storage(_) | ApiError::Serialization(_) | ApiError::Internal(_) => 500,
        }
    }

    /// Message safe to return to a client. Internal variants get a generic
    /// message so driver detail never leaves the process.
    pub fn public_message(&self) -> String {
        if self.is_internal() {
            "An unexpected error occurred, please try again later".to_string()
        } else {
            self.to_string()
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ApiError::Storage(_) | ApiError::Serialization(_) | ApiError::Internal(_)
        )
    }
}
