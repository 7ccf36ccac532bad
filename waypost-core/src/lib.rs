//! Core data models, error taxonomy and credential plane for Waypost

pub mod auth;
pub mod error;
pub mod types;

pub use error::*;
pub use types::*;

/// Result type alias for Waypost operations
pub type Result<T> = std::result::Result<T, ApiError>;
