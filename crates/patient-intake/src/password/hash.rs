//! Argon2id password hashing.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::config::Config;
use crate::error::Result;

/// Hashes and verifies passwords with Argon2id.
///
/// Every call to [`hash`](Self::hash) draws a fresh random salt, so hashing
/// the same password twice yields different PHC strings.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Create a hasher with explicit cost parameters.
    #[must_use]
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// Create a hasher from the `[security]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured costs are rejected by Argon2.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.argon2_params()?))
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password into a PHC string.
    ///
    /// # Errors
    ///
    /// Returns an error if hashing fails.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Check a password against a stored PHC string.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored hash cannot be parsed.
    pub fn verify(&self, password: &str, phc: &str) -> Result<bool> {
        let parsed = PasswordHash::new(phc)?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}
