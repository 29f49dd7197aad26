// ============================
// filestation-lib/src/auth/password.rs
// ============================
//! Password policy and hashing.
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Scrypt,
};
use serde::Deserialize;
use thiserror::Error;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Password complexity requirements
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordRequirements {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    /// Special characters are scanned but not required by default.
    pub require_special: bool,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: false,
        }
    }
}

/// Why a candidate password was rejected. Length and composition are kept
/// distinct; callers may collapse them into one user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("password must be at least {min} characters")]
    TooShort { min: usize },
    #[error("password must contain uppercase, lowercase, and digit characters")]
    Composition,
}

/// Check a candidate password against the complexity requirements.
pub fn validate_policy(
    candidate: &str,
    requirements: &PasswordRequirements,
) -> Result<(), PolicyViolation> {
    if candidate.chars().count() < requirements.min_length {
        return Err(PolicyViolation::TooShort {
            min: requirements.min_length,
        });
    }

    let mut has_upper = false;
    let mut has_lower = false;
    let mut has_digit = false;
    let mut has_special = false;
    for c in candidate.chars() {
        if c.is_uppercase() {
            has_upper = true;
        } else if c.is_lowercase() {
            has_lower = true;
        } else if c.is_numeric() {
            has_digit = true;
        } else {
            has_special = true;
        }
    }

    if (requirements.require_uppercase && !has_upper)
        || (requirements.require_lowercase && !has_lower)
        || (requirements.require_digit && !has_digit)
        || (requirements.require_special && !has_special)
    {
        return Err(PolicyViolation::Composition);
    }

    Ok(())
}

/// Hash a password using scrypt with a fresh random salt.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Scrypt.hash_password(plain.as_bytes(), &salt)?.to_string();
    Ok(hash)
}

/// Verify a password against a stored hash. A malformed hash string
/// degrades to a failed verification rather than an error.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
}
