//! Credential plane for Waypost
//!
//! - Argon2id password hashing and verification
//! - Signed, time-limited bearer tokens over a process-wide secret

pub mod password;
pub mod token;

pub use password::*;
pub use token::*;
