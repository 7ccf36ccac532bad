//! Signed bearer tokens
//!
//! Compact HS256 tokens over the process-wide secret, carrying the identity
//! claims `{user_id, email}` plus an expiry. Verification classifies every
//! failure so callers can tell tamper from expiry from garbage.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jwt_simple::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ApiError, Result, UserId};

// Tolerance applied when re-checking a failed token: wide enough that any
// token whose signature still holds must have failed on expiry alone.
const EXPIRY_GRACE_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Why a token failed verification.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is not parseable")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        ApiError::Unauthorized(format!("authentication failed: {}", e))
    }
}

/// Identity carried by a verified token. Bound to a single request's
/// processing and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdentityClaims {
    user_id: String,
    email: String,
}

/// Token signer around the startup secret. Immutable once constructed;
/// clones share the same key.
#[derive(Clone)]
pub struct TokenSigner {
    key: std::sync::Arc<HS256Key>,
}

impl TokenSigner {
    pub fn new(secret: &[u8]) -> Self {
        TokenSigner {
            key: std::sync::Arc::new(HS256Key::from_bytes(secret)),
        }
    }

    /// Issue a compact signed token for the given identity, valid for `ttl`.
    pub fn issue(
        &self,
        user_id: &UserId,
        email: &str,
        ttl: std::time::Duration,
    ) -> Result<String> {
        let identity = IdentityClaims {
            user_id: user_id.to_string(),
            email: email.to_string(),
        };
        let jwt_ttl = Duration::from_secs(ttl.as_secs());
        let claims = Claims::with_custom_claims(identity, jwt_ttl);

        self.key
            .authenticate(claims)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {}", e)))
    }

    /// Verify a compact token. Any bit-flip in payload or signature fails
    /// with `InvalidSignature`; expiry is checked with zero tolerance.
    pub fn verify(&self, token: &str) -> std::result::Result<Identity, TokenError> {
        if !has_compact_shape(token) {
            return Err(TokenError::Malformed);
        }

        let mut options = VerificationOptions::default();
        options.time_tolerance = Some(Duration::from_secs(0));

        match self.key.verify_token::<IdentityClaims>(token, Some(options)) {
            Ok(verified) => {
                let user_id = UserId::parse(&verified.custom.user_id)
                    .map_err(|_| TokenError::Malformed)?;
                Ok(Identity {
                    user_id,
                    email: verified.custom.email,
                })
            }
            Err(_) => Err(self.classify_failure(token)),
        }
    }

    // The primary verification failed; decide which kind of failure it was
    // without trusting any unverified field on its own.
    fn classify_failure(&self, token: &str) -> TokenError {
        // Re-verify with the expiry tolerance wide open. If the signature
        // holds now, the first failure can only have been the expiry check.
        let mut options = VerificationOptions::default();
        options.time_tolerance = Some(Duration::from_secs(EXPIRY_GRACE_SECS));
        if self
            .key
            .verify_token::<IdentityClaims>(token, Some(options))
            .is_ok()
        {
            return TokenError::Expired;
        }

        // Signature is bad. Tell tampered-but-decodable tokens apart from
        // ones that were never structurally valid.
        if decodes_as_jws(token) {
            TokenError::InvalidSignature
        } else {
            TokenError::Malformed
        }
    }
}

fn has_compact_shape(token: &str) -> bool {
    let mut segments = token.split('.');
    segments.clone().count() == 3 && segments.all(|s| !s.is_empty())
}

fn decodes_as_jws(token: &str) -> bool {
    let mut parts = token.split('.');
    let (header, payload, signature) = match (parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(s)) => (h, p, s),
        _ => return false,
    };

    if URL_SAFE_NO_PAD.decode(signature).is_err() {
        return false;
    }
    [header, payload].iter().all(|segment| {
        URL_SAFE_NO_PAD
            .decode(segment)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok())
            .is_some()
    })
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    const TTL: StdDuration = StdDuration::from_secs(3600);

    fn signer() -> TokenSigner {
        TokenSigner::new(b"test-secret-for-waypost-tokens")
    }

    #[test]
    fn test_issue_verify_roundtrip() {
        let signer = signer();
        let user = UserId::generate();
        let token = signer.issue(&user, "ann@x.com", TTL).unwrap();

        let identity = signer.verify(&token).unwrap();
        assert_eq!(identity.user_id, user);
        assert_eq!(identity.email, "ann@x.com");

        // Verification is repeatable until expiry.
        let again = signer.verify(&token).unwrap();
        assert_eq!(again, identity);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let signer = signer();
        assert_eq!(signer.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(signer.verify("a.b"), Err(TokenError::Malformed));
        assert_eq!(signer.verify(""), Err(TokenError::Malformed));
        assert_eq!(signer.verify("..x"), Err(TokenError::Malformed));
        // Three segments, but not base64url-encoded JSON.
        assert_eq!(signer.verify("a.b.c"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_secret_mismatch_is_invalid_signature() {
        let token = signer()
            .issue(&UserId::generate(), "ann@x.com", TTL)
            .unwrap();
        let other = TokenSigner::new(b"a-completely-different-secret");
        assert_eq!(other.verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_tampered_signature_is_invalid() {
        let signer = signer();
        let token = signer
            .issue(&UserId::generate(), "ann@x.com", TTL)
            .unwrap();

        let dot = token.rfind('.').unwrap();
        let (head, sig) = token.split_at(dot + 1);
        let mut sig_bytes = sig.as_bytes().to_vec();
        sig_bytes[0] = if sig_bytes[0] == b'A' { b'B' } else { b'A' };
        let tampered = format!("{}{}", head, String::from_utf8(sig_bytes).unwrap());

        assert_eq!(signer.verify(&tampered), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_expired_token_fails_as_expired() {
        let signer = signer();
        let token = signer
            .issue(&UserId::generate(), "ann@x.com", StdDuration::from_secs(1))
            .unwrap();

        assert!(signer.verify(&token).is_ok());
        std::thread::sleep(StdDuration::from_secs(2));
        assert_eq!(signer.verify(&token), Err(TokenError::Expired));
    }
}
