/// Password hashing and reset-token primitives
use crate::error::{AuthError, AuthResult};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Bytes of entropy in a raw reset token
const RESET_TOKEN_BYTES: usize = 32;

/// Hash a password with a salted, cost-factored bcrypt hash.
/// Runs on the blocking pool so the async workers stay free.
pub async fn hash_password(password: &str, cost: u32) -> AuthResult<String> {
    let password = password.to_string();

    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Hashing(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check a candidate password against a stored bcrypt hash
pub async fn verify_password(stored_hash: &str, candidate: &str) -> AuthResult<bool> {
    let stored_hash = stored_hash.to_string();
    let candidate = candidate.to_string();

    tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &stored_hash))
        .await
        .map_err(|e| AuthError::Hashing(format!("Password verification task failed: {}", e)))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Generate a raw reset token to hand to the user (hex encoded)
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// One-way hash of a raw reset token; only this value is persisted
pub fn hash_reset_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    hex::encode(hasher.finalize())
}
