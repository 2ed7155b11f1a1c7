// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adaptive password hashing.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};

use corvus_core::CorvusError;

/// Hashes a plaintext password with Argon2id and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, CorvusError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CorvusError::Internal(format!("failed to hash password: {e}")))
}

/// Verifies a plaintext password against a stored hash.
///
/// Returns `false` for both mismatches and malformed hashes so callers
/// collapse everything to `invalid_credentials`.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
