//! Password hashing and equal-cost verification.
//!
//! Passwords are stored as Argon2id PHC strings. Verification always runs
//! exactly one Argon2 computation at this hasher's cost, whether or not a
//! stored hash exists: when there is no record, or the stored hash is
//! unreadable or carries other parameters, the password is checked against
//! a dummy hash generated at construction. That keeps "unknown email" and
//! "wrong password" indistinguishable by latency.
//!
//! # Invariants
//! - The dummy hash is built with this hasher's own parameters.
//! - A stored hash is only verified directly when its algorithm, version and
//!   cost match this hasher's. Argon2 verifies with the parameters written in
//!   the hash, so any other hash would cost a different amount of time.
//! - The dummy hash never verifies: its password is 32 random bytes that are
//!   discarded after hashing.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{ARGON2ID_IDENT, Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};

/// Error returned when building a hasher or hashing a password fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// The Argon2 cost parameters are out of range.
    InvalidParams(String),
    /// Hashing failed.
    Hash(String),
}

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParams(reason) => write!(f, "invalid argon2 parameters: {reason}"),
            Self::Hash(reason) => write!(f, "failed to hash password: {reason}"),
        }
    }
}

impl std::error::Error for PasswordError {}

/// Outcome of a single equal-cost verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The password matches the stored hash.
    Matched,
    /// The stored hash is valid but the password does not match.
    Mismatched,
    /// There was no stored hash; the dummy hash was checked instead.
    NoRecord,
    /// The stored hash could not be parsed, or was not produced with this
    /// hasher's algorithm and cost; the dummy hash was checked instead.
    UnreadableHash,
}

impl Verification {
    #[must_use]
    pub const fn is_match(self) -> bool {
        matches!(self, Self::Matched)
    }
}

/// Argon2id hasher with a precomputed dummy hash.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl CredentialHasher {
    /// Create a hasher with the Argon2id recommended default parameters.
    ///
    /// # Errors
    /// Returns `PasswordError::Hash` if the dummy hash cannot be computed.
    pub fn new() -> Result<Self, PasswordError> {
        Self::with_params(Params::default())
    }

    /// Create a hasher with explicit cost parameters.
    ///
    /// `memory_kib` is the memory cost in KiB, `iterations` the time cost and
    /// `parallelism` the lane count.
    ///
    /// # Errors
    /// Returns `PasswordError::InvalidParams` if Argon2 rejects the values.
    pub fn with_cost(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;
        Self::with_params(params)
    }

    fn with_params(params: Params) -> Result<Self, PasswordError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let throwaway: [u8; 32] = rand::random();
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(&throwaway, &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?
            .to_string();

        Ok(Self { argon2, dummy_hash })
    }

    /// Hash `password` into an Argon2id PHC string with a fresh random salt.
    ///
    /// # Errors
    /// Returns `PasswordError::Hash` if hashing fails.
    pub fn hash(&self, password: &SecretString) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hash(e.to_string()))
    }

    /// Whether `stored_hash` is an Argon2id PHC string with exactly this
    /// hasher's version, cost and output length.
    ///
    /// Only such hashes can be verified in the same time as the dummy hash.
    #[must_use]
    pub fn is_current(&self, stored_hash: &str) -> bool {
        PasswordHash::new(stored_hash).is_ok_and(|parsed| self.shares_cost(&parsed))
    }

    fn shares_cost(&self, parsed: &PasswordHash<'_>) -> bool {
        if parsed.algorithm != ARGON2ID_IDENT {
            return false;
        }
        if !matches!(parsed.version, None | Some(0x13)) {
            return false;
        }
        let Ok(stored) = Params::try_from(parsed) else {
            return false;
        };
        let own = self.argon2.params();
        stored.m_cost() == own.m_cost()
            && stored.t_cost() == own.t_cost()
            && stored.p_cost() == own.p_cost()
            && stored.output_len().unwrap_or(Params::DEFAULT_OUTPUT_LEN)
                == own.output_len().unwrap_or(Params::DEFAULT_OUTPUT_LEN)
    }

    /// Verify `password` against `stored_hash`, or against the dummy hash
    /// when there is none.
    ///
    /// Performs exactly one Argon2 verification on every path.
    #[must_use]
    pub fn verify(&self, password: &SecretString, stored_hash: Option<&str>) -> Verification {
        let password = password.expose_secret().as_bytes();

        let Some(stored_hash) = stored_hash else {
            self.verify_dummy(password);
            return Verification::NoRecord;
        };

        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) if self.shares_cost(&parsed) => parsed,
            _ => {
                self.verify_dummy(password);
                return Verification::UnreadableHash;
            }
        };

        if self.argon2.verify_password(password, &parsed).is_ok() {
            Verification::Matched
        } else {
            Verification::Mismatched
        }
    }

    fn verify_dummy(&self, password: &[u8]) {
        if let Ok(parsed) = PasswordHash::new(&self.dummy_hash) {
            let _ = self.argon2.verify_password(password, &parsed);
        }
    }
}
