//! Per-request bearer-token gate
//!
//! Per request the gate is a terminal two-step machine: no token, then
//! either `Authenticated(identity)` or rejected. The identity is bound to
//! the single request being processed and never persisted. Ownership
//! enforcement lives in the consistency engine, not here.

use hyper::header::AUTHORIZATION;
use hyper::Request;

use waypost_core::auth::{Identity, TokenSigner};
use waypost_core::{ApiError, Result};

/// Extract and verify the bearer token for a mutating request. Every
/// failure, from a missing header to an expired token, is `Unauthorized`.
pub fn authenticate<B>(req: &Request<B>, signer: &TokenSigner) -> Result<Identity> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(missing_token)?;

    let token = header.strip_prefix("Bearer ").ok_or_else(missing_token)?;
    if token.is_empty() {
        return Err(missing_token());
    }

    Ok(signer.verify(token)?)
}

fn missing_token() -> ApiError {
    ApiError::Unauthorized("authentication failed: no bearer token".to_string())
}
