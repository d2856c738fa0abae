use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::PalisadeError;

/// Hash a plaintext password using Argon2.
pub fn hash_password(password: &str) -> Result<String, PalisadeError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PalisadeError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a plaintext password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PalisadeError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PalisadeError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Burn a full hashing round without using the result.
///
/// Called by login when the username does not resolve, so an unknown-user
/// rejection costs roughly the same as a wrong-password rejection (best
/// effort against username enumeration by timing).
pub fn burn_hashing_round(password: &str) {
    let _ = hash_password(password);
}
