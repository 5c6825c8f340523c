//! Server configuration module.
//!
//! This module provides configuration loading for the login server from
//! environment variables.
//!
//! # Environment Variables
//!
//! - `LOGIN_JWT_SECRET`: HS256 session signing secret, at least 32 bytes (required)
//! - `LOGIN_TOKEN_TTL_SECONDS`: Session lifetime in seconds (default: `86400`)
//! - `LOGIN_LISTEN_PORT`: Port to listen on (default: `3000`)
//! - `LOGIN_ENVIRONMENT`: `production` marks session cookies `Secure` (default: `development`)
//! - `LOGIN_CREDENTIALS_FILE`: JSON file of credential records (default: `./credentials.json`)
//! - `LOGIN_STORE_TIMEOUT_MS`: Bound on a single credential lookup (default: `5000`)
//!
//! # Invariants
//!
//! - The signing secret is never read anywhere else; it is handed to the
//!   `SessionIssuer` through `ServerConfig::session`.
//! - `listen_port` is always a valid port number (1-65535)

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::auth::{DEFAULT_TTL, SessionConfig, SessionConfigError};

/// Deployment environment. Only affects transport hardening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Whether session cookies must carry the `Secure` attribute.
    #[must_use]
    pub const fn secure_cookies(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Server configuration.
///
/// # Pre-conditions
///
/// When constructed via `from_env()`:
/// - `LOGIN_JWT_SECRET` must be set and strong enough for `SessionConfig`
/// - All other values must be valid for their respective types if set
#[derive(Debug)]
pub struct ServerConfig {
    /// Signing secret and TTL for issued sessions.
    pub session: SessionConfig,
    /// Port to listen on for HTTP connections.
    pub listen_port: u16,
    /// Deployment environment.
    pub environment: Environment,
    /// Path of the JSON credentials file backing the in-memory store.
    pub credentials_file: PathBuf,
    /// Bound on a single credential lookup.
    pub store_timeout: Duration,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

const JWT_SECRET: &str = "LOGIN_JWT_SECRET";
const TOKEN_TTL_SECONDS: &str = "LOGIN_TOKEN_TTL_SECONDS";
const LISTEN_PORT: &str = "LOGIN_LISTEN_PORT";
const ENVIRONMENT: &str = "LOGIN_ENVIRONMENT";
const CREDENTIALS_FILE: &str = "LOGIN_CREDENTIALS_FILE";
const STORE_TIMEOUT_MS: &str = "LOGIN_STORE_TIMEOUT_MS";

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 3000;
    /// Default credentials file.
    pub const DEFAULT_CREDENTIALS_FILE: &'static str = "./credentials.json";
    /// Default credential lookup timeout in milliseconds.
    pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `LOGIN_JWT_SECRET` is not set, empty, or shorter than 32 bytes
    /// - any optional variable is set to an unparseable value
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// `lookup` returns the value of a variable, or `None` if unset.
    ///
    /// # Errors
    ///
    /// Same as `from_env`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let session = Self::load_session(&lookup)?;
        let listen_port = Self::load_listen_port(&lookup)?;
        let environment = Self::load_environment(&lookup)?;
        let credentials_file = lookup(CREDENTIALS_FILE)
            .map_or_else(|| PathBuf::from(Self::DEFAULT_CREDENTIALS_FILE), PathBuf::from);
        let store_timeout = Duration::from_millis(parse_u64(
            &lookup,
            STORE_TIMEOUT_MS,
            Self::DEFAULT_STORE_TIMEOUT_MS,
        )?);

        Ok(Self {
            session,
            listen_port,
            environment,
            credentials_file,
            store_timeout,
        })
    }

    /// Load the signing secret and TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret is unset or rejected by
    /// `SessionConfig`, or the TTL is not a positive integer.
    fn load_session(lookup: &impl Fn(&str) -> Option<String>) -> Result<SessionConfig, ConfigError> {
        let secret = lookup(JWT_SECRET).ok_or_else(|| ConfigError::MissingEnvVar(JWT_SECRET.to_string()))?;
        let ttl_secs = parse_u64(lookup, TOKEN_TTL_SECONDS, DEFAULT_TTL.as_secs())?;

        SessionConfig::new(SecretString::from(secret), Duration::from_secs(ttl_secs)).map_err(|e| {
            let name = match e {
                SessionConfigError::InvalidTtl => TOKEN_TTL_SECONDS,
                SessionConfigError::EmptySecret | SessionConfigError::SecretTooShort { .. } => {
                    JWT_SECRET
                }
            };
            ConfigError::InvalidValue {
                name: name.to_string(),
                message: e.to_string(),
            }
        })
    }

    /// Load the listen port.
    ///
    /// Returns the default if not set.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is set but not a valid port number.
    fn load_listen_port(lookup: &impl Fn(&str) -> Option<String>) -> Result<u16, ConfigError> {
        match lookup(LISTEN_PORT) {
            Some(value) => match value.parse::<u16>() {
                Ok(port) if port != 0 => Ok(port),
                _ => Err(ConfigError::InvalidValue {
                    name: LISTEN_PORT.to_string(),
                    message: format!("'{value}' is not a valid port number (must be 1-65535)"),
                }),
            },
            None => Ok(Self::DEFAULT_PORT),
        }
    }

    fn load_environment(
        lookup: &impl Fn(&str) -> Option<String>,
    ) -> Result<Environment, ConfigError> {
        match lookup(ENVIRONMENT).as_deref() {
            None | Some("development") => Ok(Environment::Development),
            Some("production") => Ok(Environment::Production),
            Some(other) => Err(ConfigError::InvalidValue {
                name: ENVIRONMENT.to_string(),
                message: format!("'{other}' is not one of: development, production"),
            }),
        }
    }
}

fn parse_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(name) {
        Some(value) => value.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("'{value}' is not a non-negative integer"),
        }),
        None => Ok(default),
    }
}
