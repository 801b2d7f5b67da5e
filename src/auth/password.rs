use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use crate::error::{ApiError, ApiResult};

/// Stored form of a user's password: Argon2 PHC string with its own salt.
pub fn hash_password(plain: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("hash user password: {e}")))
}

/// Checks a login attempt against the stored hash. A mismatch is
/// `Unauthorized` with the same message as an unknown email; a stored hash
/// that does not parse is `Internal`.
pub fn verify_password(plain: &str, stored: &str) -> ApiResult<()> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored password hash unreadable: {e}")))?;
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .map_err(|_| invalid_credentials())
}

pub fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email/password".into())
}
