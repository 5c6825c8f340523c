//! Credential store interface and an in-memory implementation.
//!
//! `AuthCore` reads credentials through `CredentialStore` only. The store is
//! authoritative for whether an email exists; it never sees a plaintext
//! password.
//!
//! # Invariants
//! - A lookup returns at most one record per email.
//! - Lookups are read-only.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::password::CredentialHasher;
use crate::types::{Email, Role, UserId};

/// A stored login identity.
///
/// `password_hash` is an Argon2id PHC string; it is never a plaintext
/// password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Error returned when the credential store cannot answer a lookup.
///
/// These are transient from the caller's point of view and must never be
/// reported to the user as "invalid credentials".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing service could not be reached or returned an error.
    Unavailable(String),
    /// The lookup did not finish within the allotted time.
    Timeout(Duration),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "credential store unavailable: {reason}"),
            Self::Timeout(after) => {
                write!(f, "credential store lookup timed out after {}ms", after.as_millis())
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Lookup-by-email access to stored credentials.
///
/// Implementations may perform network or disk I/O; the returned future may
/// suspend and may be dropped by the caller on timeout.
pub trait CredentialStore: Send + Sync {
    /// Find the record for a normalised email.
    ///
    /// # Errors
    /// Returns `StoreError` if the store cannot answer. A missing email is
    /// `Ok(None)`, not an error.
    fn lookup(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<CredentialRecord>, StoreError>> + Send;
}

/// Error returned when building an in-memory store fails.
#[derive(Debug)]
pub enum StoreLoadError {
    /// The credentials file could not be read.
    Io(std::io::Error),
    /// The credentials file is not a JSON array of records.
    Parse(serde_json::Error),
    /// Two records share the same normalised email.
    DuplicateEmail(String),
    /// A record has a blank email, user id or password hash.
    IncompleteRecord {
        /// Position of the record in the input.
        index: usize,
        /// Name of the blank field.
        field: &'static str,
    },
    /// A record's hash is not an Argon2id hash at the hasher's cost.
    StaleHash(String),
}

impl std::fmt::Display for StoreLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read credentials: {e}"),
            Self::Parse(e) => write!(f, "failed to parse credentials: {e}"),
            Self::DuplicateEmail(email) => write!(f, "duplicate credential email: {email}"),
            Self::IncompleteRecord { index, field } => {
                write!(f, "credential record {index} has an empty {field}")
            }
            Self::StaleHash(email) => write!(
                f,
                "password hash for {email} is not argon2id at the configured cost"
            ),
        }
    }
}

impl std::error::Error for StoreLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::DuplicateEmail(_) | Self::IncompleteRecord { .. } | Self::StaleHash(_) => None,
        }
    }
}

impl From<std::io::Error> for StoreLoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StoreLoadError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

/// A read-only credential store held in memory.
///
/// Records are keyed by normalised email, so lookups are case-insensitive
/// and ignore surrounding whitespace.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    records: HashMap<Email, CredentialRecord>,
}

impl InMemoryCredentialStore {
    /// Build a store from records.
    ///
    /// # Errors
    /// Returns `StoreLoadError` if a record is incomplete or two records
    /// share an email.
    pub fn from_records(
        records: impl IntoIterator<Item = CredentialRecord>,
    ) -> Result<Self, StoreLoadError> {
        let mut by_email = HashMap::new();

        for (index, record) in records.into_iter().enumerate() {
            let Some(email) = Email::parse(&record.email) else {
                return Err(StoreLoadError::IncompleteRecord {
                    index,
                    field: "email",
                });
            };
            if record.user_id.as_str().is_empty() {
                return Err(StoreLoadError::IncompleteRecord {
                    index,
                    field: "user_id",
                });
            }
            if record.password_hash.is_empty() {
                return Err(StoreLoadError::IncompleteRecord {
                    index,
                    field: "password_hash",
                });
            }
            if by_email.contains_key(&email) {
                return Err(StoreLoadError::DuplicateEmail(email.to_string()));
            }
            by_email.insert(email, record);
        }

        Ok(Self { records: by_email })
    }

    /// Load a store from a JSON array of `CredentialRecord`s.
    ///
    /// # Errors
    /// Returns `StoreLoadError` if the file cannot be read or parsed, or its
    /// records are invalid.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreLoadError> {
        let contents = std::fs::read_to_string(path)?;
        let records: Vec<CredentialRecord> = serde_json::from_str(&contents)?;
        Self::from_records(records)
    }

    /// Check that every stored hash can be verified at `hasher`'s cost.
    ///
    /// Records that fail this check can never log in, and would otherwise
    /// only be rejected at login time.
    ///
    /// # Errors
    /// Returns `StoreLoadError::StaleHash` naming one offending email.
    pub fn ensure_current_hashes(&self, hasher: &CredentialHasher) -> Result<(), StoreLoadError> {
        self.records
            .iter()
            .find(|(_, record)| !hasher.is_current(&record.password_hash))
            .map_or(Ok(()), |(email, _)| {
                Err(StoreLoadError::StaleHash(email.to_string()))
            })
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    async fn lookup(&self, email: &Email) -> Result<Option<CredentialRecord>, StoreError> {
        Ok(self.records.get(email).cloned())
    }
}
