//! Password hashing with Argon2id
//!
//! Cost is fixed at the Argon2 v0x13 defaults (m=19456 KiB, t=2, p=1) with a
//! random 16-byte salt, so the same plaintext hashes to a different PHC
//! string on every call while verification stays deterministic.

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

use crate::{ApiError, Result};

const SALT_LEN: usize = 16;

/// One-way hash of a plaintext password into PHC string format.
pub fn hash_password(plaintext: &str) -> Result<String> {
    let mut salt_bytes = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|e| ApiError::Internal(format!("salt generation failed: {}", e)))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| ApiError::Internal(format!("salt encoding failed: {}", e)))?;

    let phc = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))?
        .to_string();
    Ok(phc)
}

/// True iff `plaintext` produced `phc`. The argon2 verifier compares digests
/// in constant time; a malformed PHC string verifies false.
pub fn verify_password(plaintext: &str, phc: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(phc) {
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    } else {
        false
    }
}

/// Burn one hashing pass. Called on the login path when the email resolves
/// to no account, so that outcome costs the same as a wrong password.
pub fn equalize_verify_delay(plaintext: &str) {
    let _ = hash_password(plaintext);
}
