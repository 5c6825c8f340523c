//! Authentication module.
//!
//! Verifies email/password credentials and issues signed session tokens.
//!
//! # Pre-conditions
//! - A `SessionConfig` with a strong secret exists before any `AuthCore`.
//!
//! # Post-conditions
//! - Authentication state is immutable once constructed.
//!
//! # Invariants
//! - Credential failures never reveal whether the email exists, through the
//!   result value or through latency.
//! - Session tokens are only issued after a successful password check.

pub mod authenticator;
pub mod jwt;
pub mod password;
pub mod session;
pub mod session_config;
pub mod store;

pub use authenticator::{
    AuthCore, AuthError, AuthRequest, AuthResult, FailureReason, INVALID_CREDENTIALS_MESSAGE,
    MALFORMED_INPUT_MESSAGE,
};
pub use password::{CredentialHasher, PasswordError, Verification};
pub use session::{SessionClaims, SessionError, SessionIssuer, SessionToken};
pub use session_config::{DEFAULT_TTL, SessionConfig, SessionConfigError};
pub use store::{
    CredentialRecord, CredentialStore, InMemoryCredentialStore, StoreError, StoreLoadError,
};
