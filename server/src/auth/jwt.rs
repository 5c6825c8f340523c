//! JWT encoding and verification for session tokens.
//!
//! Session tokens are HS256-signed JWTs. This module owns the wire shape of
//! the claims and the mapping from `jsonwebtoken` errors to `JwtError`; the
//! expiry policy lives in `session`.
//!
//! # Pre-conditions
//! - Keys are built from a secret already validated by `SessionConfig`.
//!
//! # Post-conditions
//! - `decode_claims` only returns claims whose signature verified and whose
//!   `sub` is non-empty.
//!
//! # Invariants
//! - Only HS256 is accepted; tokens declaring any other algorithm are
//!   rejected as malformed.
//! - Expiry is NOT checked here. The caller compares `exp` against its own
//!   time source so expiry follows injected time in tests.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject claim containing the user identifier.
    pub sub: String,
    /// The user's role at the time of issuance.
    pub role: String,
    /// Issued-at, seconds since Unix epoch.
    pub iat: u64,
    /// Expiry, seconds since Unix epoch.
    pub exp: u64,
    /// Random token identifier. Makes every token unique.
    pub jti: String,
}

/// Error returned when encoding or verifying a JWT fails.
#[derive(Debug)]
pub enum JwtError {
    /// The JWT signature is invalid.
    InvalidSignature,
    /// The JWT is malformed, cannot be parsed, or uses the wrong algorithm.
    MalformedToken,
    /// The 'sub' claim is missing or empty.
    MissingSubClaim,
    /// The claims could not be signed.
    Encoding(String),
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "invalid JWT signature"),
            Self::MalformedToken => write!(f, "malformed JWT"),
            Self::MissingSubClaim => write!(f, "missing 'sub' claim in JWT"),
            Self::Encoding(reason) => write!(f, "failed to sign JWT: {reason}"),
        }
    }
}

impl std::error::Error for JwtError {}

/// Signs `claims` with HS256.
///
/// # Errors
/// Returns `JwtError::Encoding` if serialization or signing fails.
pub fn encode_claims(claims: &Claims, key: &EncodingKey) -> Result<String, JwtError> {
    encode(&Header::new(Algorithm::HS256), claims, key)
        .map_err(|e| JwtError::Encoding(e.to_string()))
}

/// Verifies an HS256 JWT and returns its claims.
///
/// # Errors
/// Returns `JwtError` if the token is malformed, the signature does not
/// verify, or the subject is empty.
pub fn decode_claims(token: &str, key: &DecodingKey) -> Result<Claims, JwtError> {
    let token_data = decode::<Claims>(token, key, &validation()).map_err(map_jwt_error)?;

    let claims = token_data.claims;
    if claims.sub.is_empty() {
        return Err(JwtError::MissingSubClaim);
    }

    Ok(claims)
}

/// Validation settings shared by every decode.
fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is enforced by the session layer against its time source.
    validation.validate_exp = false;
    validation.leeway = 0;
    validation.set_required_spec_claims(&["sub", "exp"]);
    validation
}

/// Maps jsonwebtoken errors to our `JwtError` type.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> JwtError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => JwtError::MissingSubClaim,
        _ => JwtError::MalformedToken,
    }
}
