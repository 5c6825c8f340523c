//! Session issuance and validation.
//!
//! A `SessionIssuer` turns a verified `(user_id, role)` pair into a signed,
//! time-bounded `SessionToken`, and validates such tokens later. Validation
//! is a pure function of the token, the signing key and the current time;
//! there is no server-side session store and no revocation list.
//!
//! # Invariants
//! - `expires_at > issued_at` for every token (TTL is at least one second).
//! - Two tokens are never byte-identical: each carries a random `jti`.
//! - A token is rejected at or after its `expires_at`.

use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey};
use secrecy::ExposeSecret;

use super::jwt::{self, Claims, JwtError};
use super::session_config::SessionConfig;
use crate::time::{SystemTimeSource, TimeSource};
use crate::types::{Role, UserId};

/// Error returned when issuing or validating a session fails.
#[derive(Debug)]
pub enum SessionError {
    /// The token could not be signed.
    Signing(String),
    /// The token signature does not match.
    InvalidSignature,
    /// The token is past its expiry.
    Expired,
    /// The token is malformed or uses an unexpected algorithm.
    Malformed,
    /// The token has no subject.
    MissingSubject,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signing(reason) => write!(f, "failed to sign session token: {reason}"),
            Self::InvalidSignature => write!(f, "invalid session token signature"),
            Self::Expired => write!(f, "session token has expired"),
            Self::Malformed => write!(f, "malformed session token"),
            Self::MissingSubject => write!(f, "session token has no subject"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<JwtError> for SessionError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::InvalidSignature => Self::InvalidSignature,
            JwtError::MalformedToken => Self::Malformed,
            JwtError::MissingSubClaim => Self::MissingSubject,
            JwtError::Encoding(reason) => Self::Signing(reason),
        }
    }
}

/// A signed session token together with its decoded fields.
///
/// Only constructed by `SessionIssuer::issue`, which `AuthCore` calls solely
/// on a successful credential check.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    user_id: UserId,
    role: Role,
    issued_at: u64,
    expires_at: u64,
    token_id: String,
    encoded: String,
}

impl SessionToken {
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub const fn role(&self) -> &Role {
        &self.role
    }

    /// Issued-at, seconds since Unix epoch.
    #[must_use]
    pub const fn issued_at(&self) -> u64 {
        self.issued_at
    }

    /// Expiry, seconds since Unix epoch.
    #[must_use]
    pub const fn expires_at(&self) -> u64 {
        self.expires_at
    }

    /// Random identifier unique to this token.
    #[must_use]
    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    /// The compact signed JWT to hand to the client.
    #[must_use]
    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

// The encoded token is a bearer credential; keep it out of logs.
impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("user_id", &self.user_id)
            .field("role", &self.role)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("token_id", &self.token_id)
            .field("encoded", &"[REDACTED]")
            .finish()
    }
}

/// Fields recovered from a validated session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: UserId,
    pub role: Role,
    pub issued_at: u64,
    pub expires_at: u64,
    pub token_id: String,
}

/// Signs and validates session tokens with a server-held HS256 secret.
///
/// The issuer holds only read-only state and is shared across requests
/// without locking.
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
    time: Arc<dyn TimeSource>,
}

impl SessionIssuer {
    /// Create an issuer that reads the system clock.
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_time_source(config, Arc::new(SystemTimeSource))
    }

    /// Create an issuer that reads time from `time`.
    #[must_use]
    pub fn with_time_source(config: &SessionConfig, time: Arc<dyn TimeSource>) -> Self {
        let secret = config.secret().expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs: config.ttl_secs(),
            time,
        }
    }

    /// Session lifetime in whole seconds.
    #[must_use]
    pub const fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issue a session token for an authenticated user.
    ///
    /// # Post-conditions
    /// - `expires_at == issued_at + ttl` and `expires_at > issued_at`.
    ///
    /// # Errors
    /// Returns `SessionError::Signing` if the claims cannot be signed.
    pub(crate) fn issue(&self, user_id: &UserId, role: &Role) -> Result<SessionToken, SessionError> {
        let issued_at = self.time.now_secs();
        let expires_at = issued_at.saturating_add(self.ttl_secs);
        if expires_at <= issued_at {
            return Err(SessionError::Signing(
                "clock too close to overflow to compute expiry".to_string(),
            ));
        }

        let claims = Claims {
            sub: user_id.as_str().to_string(),
            role: role.as_str().to_string(),
            iat: issued_at,
            exp: expires_at,
            jti: new_token_id(),
        };
        let encoded = jwt::encode_claims(&claims, &self.encoding_key)?;

        Ok(SessionToken {
            user_id: user_id.clone(),
            role: role.clone(),
            issued_at,
            expires_at,
            token_id: claims.jti,
            encoded,
        })
    }

    /// Validate a session token and return its claims.
    ///
    /// # Errors
    /// Returns `SessionError` if the token is malformed, tampered with,
    /// signed with another key, or expired.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let claims = jwt::decode_claims(token, &self.decoding_key)?;

        if self.time.now_secs() >= claims.exp {
            return Err(SessionError::Expired);
        }

        Ok(SessionClaims {
            user_id: UserId::new(claims.sub),
            role: Role::new(claims.role),
            issued_at: claims.iat,
            expires_at: claims.exp,
            token_id: claims.jti,
        })
    }
}

/// 128 random bits, hex encoded.
fn new_token_id() -> String {
    format!("{:032x}", rand::random::<u128>())
}
