use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use secrecy::SecretString;

use crate::auth::{
    AuthCore, CredentialHasher, CredentialRecord, CredentialStore, InMemoryCredentialStore,
    SessionConfig, SessionIssuer, StoreError,
};
use crate::time::{ManualTimeSource, TimeSource};
use crate::types::{Email, Role, UserId};

pub const ALICE_EMAIL: &str = "alice@x.com";
pub const ALICE_PASSWORD: &str = "secret";
pub const TEST_SECRET: &str = "test-secret-key-that-is-long-enough";

/// Argon2id with low cost parameters so the suite stays fast.
///
/// Both the stored hashes and the dummy hash use these parameters, so
/// timing comparisons between paths still hold.
#[must_use]
pub fn fast_hasher() -> CredentialHasher {
    #[allow(clippy::expect_used)]
    CredentialHasher::with_cost(1024, 1, 1).expect("valid argon2 params")
}

#[must_use]
pub fn test_session_config() -> SessionConfig {
    #[allow(clippy::expect_used)]
    SessionConfig::new(
        SecretString::from(TEST_SECRET.to_owned()),
        Duration::from_secs(3600),
    )
    .expect("valid session config")
}

/// An issuer on the system clock.
#[must_use]
pub fn test_issuer() -> SessionIssuer {
    SessionIssuer::new(&test_session_config())
}

/// An issuer on a manual clock the caller can advance.
#[must_use]
pub fn manual_issuer(time: &Arc<ManualTimeSource>) -> SessionIssuer {
    #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
    let time: Arc<dyn TimeSource> = Arc::clone(time) as Arc<dyn TimeSource>;
    SessionIssuer::with_time_source(&test_session_config(), time)
}

/// Alice, an admin whose password is `ALICE_PASSWORD`.
#[must_use]
pub fn alice_record(hasher: &CredentialHasher) -> CredentialRecord {
    #[allow(clippy::expect_used)]
    let password_hash = hasher
        .hash(&SecretString::from(ALICE_PASSWORD.to_owned()))
        .expect("hash alice's password");
    CredentialRecord {
        user_id: UserId::new("user-alice"),
        email: ALICE_EMAIL.to_string(),
        password_hash,
        role: Role::new("admin"),
    }
}

/// A store holding only Alice.
#[must_use]
pub fn seeded_store(hasher: &CredentialHasher) -> InMemoryCredentialStore {
    #[allow(clippy::expect_used)]
    InMemoryCredentialStore::from_records([alice_record(hasher)]).expect("valid records")
}

/// An authenticator over a store holding only Alice.
#[must_use]
pub fn seeded_core() -> AuthCore<InMemoryCredentialStore> {
    let hasher = fast_hasher();
    let store = seeded_store(&hasher);
    AuthCore::new(store, hasher, test_issuer())
}

/// An authenticator over a store holding Alice plus one extra record with
/// the given raw `password_hash`.
#[must_use]
pub fn seeded_core_with(email: &str, password_hash: &str) -> AuthCore<InMemoryCredentialStore> {
    let hasher = fast_hasher();
    let extra = CredentialRecord {
        user_id: UserId::new("user-extra"),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        role: Role::new("member"),
    };
    #[allow(clippy::expect_used)]
    let store = InMemoryCredentialStore::from_records([alice_record(&hasher), extra])
        .expect("valid records");
    AuthCore::new(store, hasher, test_issuer())
}

/// A store whose every lookup fails as unavailable.
#[derive(Debug, Default)]
pub struct FailingStore {
    calls: AtomicUsize,
}

impl FailingStore {
    /// Number of lookups attempted so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialStore for FailingStore {
    async fn lookup(&self, _email: &Email) -> Result<Option<CredentialRecord>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// A store that sleeps before answering "not found".
#[derive(Debug)]
pub struct SlowStore {
    delay: Duration,
}

impl SlowStore {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl CredentialStore for SlowStore {
    async fn lookup(&self, _email: &Email) -> Result<Option<CredentialRecord>, StoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }
}
