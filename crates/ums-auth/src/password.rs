//! Password encoding
//!
//! New passwords are hashed with bcrypt (salted, adaptive cost). Stored
//! hashes are verified by prefix so Argon2 PHC strings keep working.

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordVerifier};
use tracing::warn;

use crate::error::AuthError;

/// Default bcrypt cost
pub const DEFAULT_COST: u32 = 10;

/// Longest password bcrypt hashes without truncating, in bytes
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Shortest password accepted for new accounts
pub const MIN_PASSWORD_LENGTH: usize = 8;

const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// One-way password encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordEncoder {
    cost: u32,
}

impl PasswordEncoder {
    /// Create an encoder; the cost is clamped to bcrypt's valid range
    pub fn new(cost: u32) -> Self {
        let clamped = cost.clamp(MIN_COST, MAX_COST);
        if clamped != cost {
            warn!("bcrypt cost {} out of range, using {}", cost, clamped);
        }
        Self { cost: clamped }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a raw password
    ///
    /// Passwords longer than [`MAX_PASSWORD_BYTES`] are rejected rather than
    /// silently truncated.
    pub fn encode(&self, raw_password: &str) -> Result<String, AuthError> {
        if raw_password.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::PasswordHash(format!(
                "password exceeds {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }
        bcrypt::hash(raw_password, self.cost).map_err(|e| AuthError::PasswordHash(e.to_string()))
    }

    /// Check a raw password against a stored hash
    ///
    /// Malformed or unknown hashes never match.
    pub fn matches(&self, raw_password: &str, encoded_password: &str) -> Result<bool, AuthError> {
        if encoded_password.is_empty() {
            return Ok(false);
        }

        if encoded_password.starts_with("$argon2") {
            let parsed = match PasswordHash::new(encoded_password) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Stored argon2 hash is malformed: {}", e);
                    return Ok(false);
                }
            };
            return Ok(Argon2::default()
                .verify_password(raw_password.as_bytes(), &parsed)
                .is_ok());
        }

        if encoded_password.starts_with("$2") {
            // bcrypt only sees the first 72 bytes
            if raw_password.len() > MAX_PASSWORD_BYTES {
                return Ok(false);
            }
            return match bcrypt::verify(raw_password, encoded_password) {
                Ok(valid) => Ok(valid),
                Err(e) => {
                    warn!("Stored bcrypt hash is malformed: {}", e);
                    Ok(false)
                }
            };
        }

        warn!("Stored password hash has an unknown format");
        Ok(false)
    }
}

impl Default for PasswordEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}
