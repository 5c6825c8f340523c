#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code so bad configuration exits cleanly.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::net::SocketAddr;
use std::sync::Arc;

use login_server::auth::{AuthCore, CredentialHasher, InMemoryCredentialStore, SessionIssuer};
use login_server::config::ServerConfig;
use login_server::routes::{AppState, CookiePolicy, router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "login_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: credentials_file={}, listen_port={}, environment={:?}, token_ttl={}s",
        config.credentials_file.display(),
        config.listen_port,
        config.environment,
        config.session.ttl_secs()
    );

    let store = match InMemoryCredentialStore::from_json_file(&config.credentials_file) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to load credentials: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("Loaded {} credential records", store.len());

    let hasher = match CredentialHasher::new() {
        Ok(hasher) => hasher,
        Err(e) => {
            tracing::error!("Failed to initialise password hasher: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = store.ensure_current_hashes(&hasher) {
        tracing::error!("Refusing to serve credentials: {e}");
        std::process::exit(1);
    }

    let issuer = SessionIssuer::new(&config.session);
    let core = AuthCore::new(store, hasher, issuer).with_lookup_timeout(config.store_timeout);
    let state = AppState::new(
        Arc::new(core),
        CookiePolicy {
            secure: config.environment.secure_cookies(),
        },
    );

    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.listen_port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    });
}
