/// Password hashing and verification using Argon2id
///
/// - Algorithm: Argon2id (memory-hard, resistant to GPU attacks)
/// - Salt: 16 bytes random, embedded in the PHC string
/// - Cost: configurable through [`PasswordConfig`]
///
/// Verification never reports *why* it failed: a wrong password and an
/// unparseable stored hash both yield `false`.
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use authgate_core::AuthConfig;
use thiserror::Error;

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Invalid Argon2 parameters: {0}")]
    InvalidParams(String),

    #[error("Failed to hash password: {0}")]
    HashingFailed(String),
}

/// Password hashing configuration
///
/// Increasing memory or iterations improves security but slows down hashing.
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Time cost (iterations)
    pub time_cost: u32,
    /// Parallelism (lanes)
    pub parallelism: u32,
    /// Output length in bytes
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 19456, // 19 MiB
            time_cost: 2,
            parallelism: 1,
            output_len: Some(32),
        }
    }
}

impl From<&AuthConfig> for PasswordConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            memory_cost: config.memory_cost,
            time_cost: config.time_cost,
            parallelism: config.parallelism,
            ..Default::default()
        }
    }
}

impl PasswordConfig {
    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))
    }
}

/// Salted, cost-bounded password hasher
///
/// Owns its Argon2 parameters; cloned into the application state and
/// shared across requests. Holds no mutable state.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

impl PasswordHasher {
    /// Build a hasher, validating the cost parameters up front
    pub fn new(config: &PasswordConfig) -> Result<Self, PasswordError> {
        let params = config.to_params()?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password
    ///
    /// Returns a PHC string (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`)
    /// that carries its own salt and parameters.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(password_hash.to_string())
    }

    /// Verify a candidate password against a stored hash
    ///
    /// Returns `false` on mismatch and on a malformed stored hash. The
    /// digest comparison inside `argon2` is constant-time.
    pub fn verify(&self, hashed: &str, candidate: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hashed) else {
            return false;
        };

        // Parameters come from the PHC string, not from self.
        self.argon2
            .verify_password(candidate.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(&PasswordConfig {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
        output_len: Some(32),
    })
    .expect("valid test params")
}
