//! Credential verification and session issuance.
//!
//! `AuthCore::authenticate` is the single entry point. Each call is a
//! one-shot evaluation:
//!
//! ```text
//! Start -> LookupDone -> Verified | Rejected -> Issued | Failed
//! ```
//!
//! Nothing survives past the call.
//!
//! # Invariants
//! - Exactly one Argon2 verification runs for every request that reaches the
//!   store and gets an answer, found or not.
//! - A `SessionToken` is only created on the `Verified` path.
//! - Store failures are reported as `AuthError::StoreUnavailable`, never as
//!   `FailureReason::InvalidCredentials`.
//! - The plaintext password is never logged.
//!
//! # Timeouts
//! Only the store lookup is bounded by `lookup_timeout`. Password
//! verification runs on the blocking pool and completes even if the caller
//! drops the returned future, so the dummy verification on the not-found
//! path is never skipped. A caller deadline shorter than one verification
//! can therefore tell "store timed out" from "credentials rejected"; it
//! cannot tell "unknown email" from "wrong password".

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument, warn};

use super::password::{CredentialHasher, Verification};
use super::session::{SessionError, SessionIssuer, SessionToken};
use super::store::{CredentialStore, StoreError};
use crate::types::{Email, Role, UserId};

/// Message shown to users for every credential failure.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

/// Message shown to users when the email or password is missing.
pub const MALFORMED_INPUT_MESSAGE: &str = "Email and password are required";

/// Default bound on a single store lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// A login attempt.
///
/// The password is a `SecretString`: redacted from `Debug` and zeroized on
/// drop.
#[derive(Debug)]
pub struct AuthRequest {
    pub email: String,
    pub password: SecretString,
}

impl AuthRequest {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Why a login attempt was rejected.
///
/// Internal only: callers should show `public_message()` to users, never
/// the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Unknown email or wrong password. The two are deliberately merged.
    InvalidCredentials,
    /// Empty email or password; rejected before any store call.
    MalformedInput,
}

impl FailureReason {
    /// The only text that may be shown to the user.
    #[must_use]
    pub const fn public_message(self) -> &'static str {
        match self {
            Self::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE,
            Self::MalformedInput => MALFORMED_INPUT_MESSAGE,
        }
    }
}

/// Outcome of an authentication attempt that ran to a decision.
#[derive(Debug)]
pub enum AuthResult {
    Success {
        user_id: UserId,
        /// The email as stored on the matched record.
        email: String,
        role: Role,
        token: SessionToken,
    },
    Failure {
        reason: FailureReason,
    },
}

impl AuthResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    const fn failure(reason: FailureReason) -> Self {
        Self::Failure { reason }
    }
}

/// Error returned when authentication could not reach a decision.
#[derive(Debug)]
pub enum AuthError {
    /// The credential store failed or timed out. The caller may retry.
    StoreUnavailable(StoreError),
    /// The session could not be signed. Fatal until reconfigured.
    Configuration(SessionError),
    /// The password verification task failed to run to completion.
    Internal(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreUnavailable(e) => write!(f, "store unavailable: {e}"),
            Self::Configuration(e) => write!(f, "session configuration error: {e}"),
            Self::Internal(reason) => write!(f, "internal error: {reason}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StoreUnavailable(e) => Some(e),
            Self::Configuration(e) => Some(e),
            Self::Internal(_) => None,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        Self::StoreUnavailable(e)
    }
}

impl From<SessionError> for AuthError {
    fn from(e: SessionError) -> Self {
        Self::Configuration(e)
    }
}

/// Verifies credentials against a `CredentialStore` and issues sessions.
///
/// Holds only read-only state and is shared between concurrent requests
/// behind an `Arc`.
pub struct AuthCore<S> {
    store: S,
    hasher: Arc<CredentialHasher>,
    issuer: SessionIssuer,
    lookup_timeout: Duration,
}

impl<S: CredentialStore> AuthCore<S> {
    /// Create an authenticator with the default lookup timeout.
    #[must_use]
    pub fn new(store: S, hasher: CredentialHasher, issuer: SessionIssuer) -> Self {
        Self {
            store,
            hasher: Arc::new(hasher),
            issuer,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Bound each store lookup by `timeout`.
    #[must_use]
    pub const fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// The issuer used for successful logins, e.g. to validate tokens later.
    #[must_use]
    pub const fn issuer(&self) -> &SessionIssuer {
        &self.issuer
    }

    /// Authenticate an email/password pair.
    ///
    /// # Errors
    /// Returns `AuthError::StoreUnavailable` if the store fails or times
    /// out, `AuthError::Configuration` if the session cannot be signed, and
    /// `AuthError::Internal` if the verification task dies.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, request: AuthRequest) -> Result<AuthResult, AuthError> {
        let AuthRequest { email, password } = request;

        let Some(email) = Email::parse(&email) else {
            debug!("rejected login with empty email");
            return Ok(AuthResult::failure(FailureReason::MalformedInput));
        };
        if password.expose_secret().is_empty() {
            debug!("rejected login with empty password");
            return Ok(AuthResult::failure(FailureReason::MalformedInput));
        }

        let record = match tokio::time::timeout(self.lookup_timeout, self.store.lookup(&email)).await
        {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                warn!("credential lookup failed: {e}");
                return Err(e.into());
            }
            Err(_) => {
                let e = StoreError::Timeout(self.lookup_timeout);
                warn!("credential lookup failed: {e}");
                return Err(e.into());
            }
        };

        let stored_hash = record.as_ref().map(|r| r.password_hash.clone());
        let verification = self.verify(password, stored_hash).await?;

        let record = match (verification, record) {
            (Verification::Matched, Some(record)) => record,
            (Verification::UnreadableHash, Some(record)) => {
                warn!(
                    user_id = %record.user_id,
                    "stored password hash is unreadable or not at the current cost"
                );
                return Ok(AuthResult::failure(FailureReason::InvalidCredentials));
            }
            (verification, _) => {
                debug!(?verification, "login rejected");
                return Ok(AuthResult::failure(FailureReason::InvalidCredentials));
            }
        };

        let token = self.issuer.issue(&record.user_id, &record.role)?;
        info!(user_id = %record.user_id, role = %record.role, "login successful");

        Ok(AuthResult::Success {
            user_id: record.user_id,
            email: record.email,
            role: record.role,
            token,
        })
    }

    /// Run one equal-cost verification on the blocking pool.
    async fn verify(
        &self,
        password: SecretString,
        stored_hash: Option<String>,
    ) -> Result<Verification, AuthError> {
        #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&password, stored_hash.as_deref()))
            .await
            .map_err(|e| AuthError::Internal(format!("password verification task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::auth::InMemoryCredentialStore;
    use crate::testing::{
        ALICE_EMAIL, ALICE_PASSWORD, FailingStore, SlowStore, fast_hasher, manual_issuer,
        seeded_core, seeded_core_with, seeded_store, test_issuer,
    };
    use crate::time::ManualTimeSource;

    fn expect_failure(result: Result<AuthResult, AuthError>) -> FailureReason {
        match result {
            Ok(AuthResult::Failure { reason }) => reason,
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_correct_password_succeeds() {
        let core = seeded_core();

        let result = core
            .authenticate(AuthRequest::new(ALICE_EMAIL, ALICE_PASSWORD))
            .await
            .expect("decision");

        match result {
            AuthResult::Success {
                user_id,
                email,
                role,
                token,
            } => {
                assert_eq!(user_id, UserId::new("user-alice"));
                assert_eq!(email, ALICE_EMAIL);
                assert_eq!(role, Role::new("admin"));
                assert_eq!(token.user_id(), &user_id);
                assert_eq!(token.role(), &role);
            }
            AuthResult::Failure { reason } => panic!("expected success, got {reason:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_token_validates() {
        let core = seeded_core();

        let result = core
            .authenticate(AuthRequest::new(ALICE_EMAIL, ALICE_PASSWORD))
            .await
            .expect("decision");
        let AuthResult::Success { token, .. } = result else {
            panic!("expected success");
        };

        let claims = core.issuer().validate(token.encoded()).expect("valid");
        assert_eq!(claims.user_id, UserId::new("user-alice"));
        assert_eq!(claims.role, Role::new("admin"));
    }

    #[tokio::test]
    async fn test_success_token_expires_after_ttl() {
        let time = Arc::new(ManualTimeSource::default_start());
        let hasher = fast_hasher();
        let store = seeded_store(&hasher);
        let core = AuthCore::new(store, hasher, manual_issuer(&time));

        let result = core
            .authenticate(AuthRequest::new(ALICE_EMAIL, ALICE_PASSWORD))
            .await
            .expect("decision");
        let AuthResult::Success { token, .. } = result else {
            panic!("expected success");
        };
        assert_eq!(token.expires_at() - token.issued_at(), 3600);

        time.advance(3599);
        assert!(core.issuer().validate(token.encoded()).is_ok());

        time.advance(1);
        assert!(matches!(
            core.issuer().validate(token.encoded()),
            Err(SessionError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_single_user_scenario() {
        let hasher = fast_hasher();
        let password_hash = hasher
            .hash(&SecretString::from("secret".to_owned()))
            .expect("hashed");
        let store = InMemoryCredentialStore::from_records([crate::auth::CredentialRecord {
            user_id: UserId::new("u-1"),
            email: "a@x.com".to_string(),
            password_hash,
            role: Role::new("member"),
        }])
        .expect("valid records");
        let core = AuthCore::new(store, hasher, test_issuer());

        let result = core
            .authenticate(AuthRequest::new("a@x.com", "secret"))
            .await
            .expect("decision");
        match result {
            AuthResult::Success { user_id, role, .. } => {
                assert_eq!(user_id, UserId::new("u-1"));
                assert_eq!(role, Role::new("member"));
            }
            AuthResult::Failure { reason } => panic!("expected success, got {reason:?}"),
        }

        let reason = expect_failure(core.authenticate(AuthRequest::new("a@x.com", "wrong")).await);
        assert_eq!(reason, FailureReason::InvalidCredentials);

        let reason = expect_failure(
            core.authenticate(AuthRequest::new("nobody@x.com", "anything"))
                .await,
        );
        assert_eq!(reason, FailureReason::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_email_is_normalised_before_lookup() {
        let core = seeded_core();

        let result = core
            .authenticate(AuthRequest::new("  ALICE@x.com ", ALICE_PASSWORD))
            .await
            .expect("decision");
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_wrong_password_fails() {
        let core = seeded_core();

        let reason = expect_failure(
            core.authenticate(AuthRequest::new(ALICE_EMAIL, "wrong"))
                .await,
        );
        assert_eq!(reason, FailureReason::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_unknown_email_fails() {
        let core = seeded_core();

        let reason = expect_failure(
            core.authenticate(AuthRequest::new("nobody@x.com", "anything"))
                .await,
        );
        assert_eq!(reason, FailureReason::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_unknown_email_with_stored_users_password_fails() {
        let core = seeded_core();

        let reason = expect_failure(
            core.authenticate(AuthRequest::new("nobody@x.com", ALICE_PASSWORD))
                .await,
        );
        assert_eq!(reason, FailureReason::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_unreadable_stored_hash_fails_as_invalid_credentials() {
        let core = seeded_core_with("broken@x.com", "not-a-phc-string");

        let reason = expect_failure(
            core.authenticate(AuthRequest::new("broken@x.com", "not-a-phc-string"))
                .await,
        );
        assert_eq!(reason, FailureReason::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_empty_inputs_are_malformed() {
        let core = AuthCore::new(FailingStore::default(), fast_hasher(), test_issuer());

        for (email, password) in [("", "secret"), ("   ", "secret"), ("a@x.com", "")] {
            let reason = expect_failure(
                core.authenticate(AuthRequest::new(email, password))
                    .await,
            );
            assert_eq!(reason, FailureReason::MalformedInput);
        }
        // Malformed input never reaches the store.
        assert_eq!(core.store.calls(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_invalid_credentials() {
        let core = AuthCore::new(FailingStore::default(), fast_hasher(), test_issuer());

        let result = core
            .authenticate(AuthRequest::new(ALICE_EMAIL, ALICE_PASSWORD))
            .await;

        assert!(matches!(
            result,
            Err(AuthError::StoreUnavailable(StoreError::Unavailable(_)))
        ));
        assert_eq!(core.store.calls(), 1);
    }

    #[tokio::test]
    async fn test_store_timeout_is_store_unavailable() {
        let core = AuthCore::new(
            SlowStore::new(Duration::from_secs(60)),
            fast_hasher(),
            test_issuer(),
        )
        .with_lookup_timeout(Duration::from_millis(20));

        let result = core
            .authenticate(AuthRequest::new(ALICE_EMAIL, ALICE_PASSWORD))
            .await;

        assert!(matches!(
            result,
            Err(AuthError::StoreUnavailable(StoreError::Timeout(_)))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_logins() {
        let core = Arc::new(seeded_core());

        let mut handles = Vec::new();
        for attempt in 0..8 {
            #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
            let core = Arc::clone(&core);
            handles.push(tokio::spawn(async move {
                let password = if attempt % 2 == 0 { ALICE_PASSWORD } else { "wrong" };
                core.authenticate(AuthRequest::new(ALICE_EMAIL, password))
                    .await
                    .map(|result| result.is_success())
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.expect("task").expect("decision") {
                successes += 1;
            }
        }
        assert_eq!(successes, 4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_email_and_wrong_password_take_similar_time() {
        let core = seeded_core();
        let trials: u32 = 20;

        // Warm up the blocking pool so the first spawn is not measured.
        let _ = core
            .authenticate(AuthRequest::new("warmup@x.com", "warmup"))
            .await;

        let mut unknown = Duration::ZERO;
        let mut wrong = Duration::ZERO;
        for _ in 0..trials {
            let started = Instant::now();
            let _ = core
                .authenticate(AuthRequest::new("nobody@x.com", "anything"))
                .await;
            unknown += started.elapsed();

            let started = Instant::now();
            let _ = core
                .authenticate(AuthRequest::new(ALICE_EMAIL, "wrong"))
                .await;
            wrong += started.elapsed();
        }

        let unknown = unknown / trials;
        let wrong = wrong / trials;
        let slower = unknown.max(wrong);
        let faster = unknown.min(wrong);

        // Both paths run one Argon2 verification with the same parameters.
        assert!(
            slower - faster < slower / 4,
            "unknown email averaged {unknown:?}, wrong password averaged {wrong:?}"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_hash_at_other_cost_takes_dummy_time() {
        // Stored with a much higher cost than the core's hasher.
        let stronger = CredentialHasher::with_cost(16 * 1024, 3, 1).expect("valid params");
        let stale_hash = stronger
            .hash(&SecretString::from("old-password".to_owned()))
            .expect("hashed");
        let core = seeded_core_with("stale@x.com", &stale_hash);
        let trials: u32 = 10;

        let _ = core
            .authenticate(AuthRequest::new("warmup@x.com", "warmup"))
            .await;

        let mut unknown = Duration::ZERO;
        let mut stale = Duration::ZERO;
        for _ in 0..trials {
            let started = Instant::now();
            let _ = core
                .authenticate(AuthRequest::new("nobody@x.com", "old-password"))
                .await;
            unknown += started.elapsed();

            let started = Instant::now();
            let reason = expect_failure(
                core.authenticate(AuthRequest::new("stale@x.com", "old-password"))
                    .await,
            );
            stale += started.elapsed();
            assert_eq!(reason, FailureReason::InvalidCredentials);
        }

        let unknown = unknown / trials;
        let stale = stale / trials;
        let slower = unknown.max(stale);
        let faster = unknown.min(stale);

        assert!(
            slower - faster < slower / 4,
            "unknown email averaged {unknown:?}, stale hash averaged {stale:?}"
        );
    }

    #[tokio::test]
    async fn test_foreign_algorithm_hash_fails_as_invalid_credentials() {
        let core = seeded_core_with(
            "legacy@x.com",
            "$pbkdf2-sha256$i=1000$c2FsdHNhbHQ$aGFzaGhhc2hoYXNoaGFzaGhhc2hoYXNoaGFzaA",
        );

        let reason = expect_failure(
            core.authenticate(AuthRequest::new("legacy@x.com", "anything"))
                .await,
        );
        assert_eq!(reason, FailureReason::InvalidCredentials);
    }

    #[test]
    fn test_public_message_is_generic() {
        assert_eq!(
            FailureReason::InvalidCredentials.public_message(),
            "Invalid email or password"
        );
        assert_eq!(
            FailureReason::MalformedInput.public_message(),
            "Email and password are required"
        );
    }

    #[test]
    fn test_auth_request_debug_redacts_password() {
        let request = AuthRequest::new("a@x.com", "super-secret-password");
        let debug = format!("{request:?}");
        assert!(!debug.contains("super-secret-password"));
    }

    #[test]
    fn test_auth_error_display() {
        let e = AuthError::StoreUnavailable(StoreError::Unavailable("down".to_string()));
        assert_eq!(e.to_string(), "store unavailable: credential store unavailable: down");

        let e = AuthError::Configuration(SessionError::Signing("no key".to_string()));
        assert_eq!(
            e.to_string(),
            "session configuration error: failed to sign session token: no key"
        );

        let e = AuthError::Internal("panicked".to_string());
        assert_eq!(e.to_string(), "internal error: panicked");
    }
}
