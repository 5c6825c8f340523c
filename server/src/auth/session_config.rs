//! Session signing configuration.
//!
//! # Pre-conditions
//! - The signing secret must be at least `MIN_SECRET_LEN` bytes.
//! - The token TTL must be at least one second.
//!
//! # Post-conditions
//! - `SessionConfig` instances are immutable once created.
//!
//! # Invariants
//! - A `SessionConfig` never holds an empty or short secret, so a
//!   `SessionIssuer` built from it can never sign with a weak key.
//! - `ttl` is never zero, so `expires_at > issued_at` for every token.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

/// Minimum length of the HS256 signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Default session lifetime: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Error returned when session configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionConfigError {
    /// The signing secret is missing or empty.
    EmptySecret,
    /// The signing secret is shorter than `MIN_SECRET_LEN` bytes.
    SecretTooShort {
        /// Length of the rejected secret in bytes.
        len: usize,
    },
    /// The TTL is shorter than one second.
    InvalidTtl,
}

impl std::fmt::Display for SessionConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySecret => write!(f, "session signing secret must not be empty"),
            Self::SecretTooShort { len } => write!(
                f,
                "session signing secret is {len} bytes, must be at least {MIN_SECRET_LEN}"
            ),
            Self::InvalidTtl => write!(f, "session TTL must be at least one second"),
        }
    }
}

impl std::error::Error for SessionConfigError {}

/// HS256 signing secret plus expiry policy for issued sessions.
///
/// The secret is held as a `SecretString` so it is zeroized on drop and
/// redacted from `Debug` output.
#[derive(Debug)]
pub struct SessionConfig {
    secret: SecretString,
    ttl: Duration,
}

impl SessionConfig {
    /// Create a new session configuration.
    ///
    /// # Pre-conditions
    /// - `secret` must be at least `MIN_SECRET_LEN` bytes.
    /// - `ttl` must be at least one second.
    ///
    /// # Errors
    /// Returns `SessionConfigError` if either pre-condition is violated.
    pub fn new(secret: SecretString, ttl: Duration) -> Result<Self, SessionConfigError> {
        let len = secret.expose_secret().len();
        if len == 0 {
            return Err(SessionConfigError::EmptySecret);
        }
        if len < MIN_SECRET_LEN {
            return Err(SessionConfigError::SecretTooShort { len });
        }
        if ttl.as_secs() == 0 {
            return Err(SessionConfigError::InvalidTtl);
        }
        Ok(Self { secret, ttl })
    }

    /// The signing secret.
    #[must_use]
    pub const fn secret(&self) -> &SecretString {
        &self.secret
    }

    /// Session lifetime. Sub-second precision is ignored.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Session lifetime in whole seconds.
    #[must_use]
    pub const fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_new_valid() {
        let config = SessionConfig::new(
            SecretString::from(GOOD_SECRET.to_owned()),
            Duration::from_secs(3600),
        )
        .expect("valid config");

        assert_eq!(config.secret().expose_secret(), GOOD_SECRET);
        assert_eq!(config.ttl_secs(), 3600);
    }

    #[test]
    fn test_default_ttl_is_one_day() {
        let config =
            SessionConfig::new(SecretString::from(GOOD_SECRET.to_owned()), DEFAULT_TTL).expect("valid");
        assert_eq!(config.ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_empty_secret() {
        let result = SessionConfig::new(SecretString::from(String::new()), DEFAULT_TTL);
        assert!(matches!(result, Err(SessionConfigError::EmptySecret)));
    }

    #[test]
    fn test_short_secret() {
        let result = SessionConfig::new(SecretString::from("short".to_owned()), DEFAULT_TTL);
        assert!(matches!(
            result,
            Err(SessionConfigError::SecretTooShort { len: 5 })
        ));
    }

    #[test]
    fn test_zero_ttl() {
        let result = SessionConfig::new(SecretString::from(GOOD_SECRET.to_owned()), Duration::ZERO);
        assert!(matches!(result, Err(SessionConfigError::InvalidTtl)));
    }

    #[test]
    fn test_sub_second_ttl_rejected() {
        let result = SessionConfig::new(
            SecretString::from(GOOD_SECRET.to_owned()),
            Duration::from_millis(999),
        );
        assert!(matches!(result, Err(SessionConfigError::InvalidTtl)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config =
            SessionConfig::new(SecretString::from(GOOD_SECRET.to_owned()), DEFAULT_TTL).expect("valid");
        let debug = format!("{config:?}");
        assert!(!debug.contains(GOOD_SECRET));
    }

    #[test]
    fn test_session_config_error_display() {
        assert_eq!(
            SessionConfigError::EmptySecret.to_string(),
            "session signing secret must not be empty"
        );
        assert_eq!(
            SessionConfigError::SecretTooShort { len: 4 }.to_string(),
            "session signing secret is 4 bytes, must be at least 32"
        );
        assert_eq!(
            SessionConfigError::InvalidTtl.to_string(),
            "session TTL must be at least one second"
        );
    }
}
