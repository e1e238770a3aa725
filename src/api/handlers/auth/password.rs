//! Password hashing via bcrypt.
//!
//! bcrypt salts per hash, so equal passwords never produce equal hashes and
//! verification must go through [`verify_password`], never string equality.

use anyhow::{Context, Result};

/// Hash a password with the configured work factor.
///
/// # Errors
/// Returns an error if hashing fails.
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost).context("failed to hash password")
}

/// Verify a password against a stored bcrypt hash.
///
/// # Errors
/// Returns an error if the stored hash is malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).context("failed to verify password")
}
