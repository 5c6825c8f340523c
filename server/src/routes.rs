//! HTTP adapter for the login flow.
//!
//! Maps `AuthCore` outcomes onto status codes, JSON bodies and the session
//! cookie. The authentication decision itself never sees HTTP types.
//!
//! Routes:
//! - `POST /api/login`: JSON `{email, password}`; sets the `token` cookie on success
//! - `GET /login`: static login form
//! - `GET /health`: liveness probe

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode, header::InvalidHeaderValue, header::SET_COOKIE},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::{AuthCore, AuthError, AuthRequest, AuthResult, CredentialStore, FailureReason};
use crate::types::{Role, UserId};

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "token";

/// Attributes applied to the session cookie.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    /// Add `Secure`; enabled in production.
    pub secure: bool,
}

/// Shared state for the login routes.
pub struct AppState<S> {
    core: Arc<AuthCore<S>>,
    cookies: CookiePolicy,
}

impl<S> AppState<S> {
    #[must_use]
    pub const fn new(core: Arc<AuthCore<S>>, cookies: CookiePolicy) -> Self {
        Self { core, cookies }
    }
}

// Manual impl: `S` itself need not be `Clone`.
impl<S> Clone for AppState<S> {
    #[allow(clippy::disallowed_methods)] // Arc::clone is safe and expected
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            cookies: self.cookies,
        }
    }
}

/// Build the router for the login service.
pub fn router<S: CredentialStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/api/login", post(login::<S>))
        .route("/login", get(login_page))
        .route("/health", get(health))
        .with_state(state)
}

/// Body of `POST /api/login`. Missing fields count as empty.
#[derive(Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: LoginUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

async fn login<S: CredentialStore + 'static>(
    State(state): State<AppState<S>>,
    Json(body): Json<LoginBody>,
) -> Response {
    let request = AuthRequest::new(body.email, body.password);

    match state.core.authenticate(request).await {
        Ok(AuthResult::Success {
            user_id,
            email,
            role,
            token,
        }) => {
            let max_age = token.expires_at().saturating_sub(token.issued_at());
            let cookie = match session_cookie(state.cookies, token.encoded(), max_age) {
                Ok(cookie) => cookie,
                Err(e) => {
                    error!("failed to build session cookie: {e}");
                    return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
                }
            };
            let body = LoginResponse {
                message: "Login successful".to_string(),
                user: LoginUser {
                    id: user_id,
                    email,
                    role,
                },
            };
            (StatusCode::OK, [(SET_COOKIE, cookie)], Json(body)).into_response()
        }
        Ok(AuthResult::Failure { reason }) => {
            let status = match reason {
                FailureReason::InvalidCredentials => StatusCode::UNAUTHORIZED,
                FailureReason::MalformedInput => StatusCode::BAD_REQUEST,
            };
            error_response(status, reason.public_message())
        }
        Err(AuthError::StoreUnavailable(_)) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
        ),
        Err(e) => {
            error!("login failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// Build the `HttpOnly` session cookie.
fn session_cookie(
    policy: CookiePolicy,
    token: &str,
    max_age_secs: u64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}"
    );
    if policy.secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

async fn health() -> &'static str {
    "ok"
}

const LOGIN_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Login</title>
</head>
<body>
  <form id="login-form">
    <h1>Login</h1>
    <input name="email" type="email" required>
    <input name="password" type="password" required>
    <button type="submit">Login</button>
  </form>
  <script>
    document.getElementById("login-form").addEventListener("submit", async (event) => {
      event.preventDefault();
      const form = new FormData(event.currentTarget);
      const response = await fetch("/api/login", {
        method: "POST",
        headers: { "Content-Type": "application/json" },
        body: JSON.stringify({
          email: form.get("email"),
          password: form.get("password"),
        }),
      });
      if (response.ok) {
        window.location.assign("/dashboard");
      } else {
        alert("Invalid email or password");
      }
    });
  </script>
</body>
</html>
"#;
