use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizparty::{app, auth, broadcast, config::AppConfig, state::AppState, store::ContentStore};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizparty=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting quizparty...");

    let config = AppConfig::from_env();
    let auth_config = Arc::new(auth::AuthConfig::from_env());

    let store = match ContentStore::load_from_path(&config.content_path).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(
                "Failed to load content from {}: {}",
                config.content_path.display(),
                e
            );
            return;
        }
    };

    let port = config.port;
    let state = Arc::new(AppState::with_config(config, store).with_persistence());

    // Time budget of the active mini-game
    broadcast::spawn_deadline_watcher(state.clone());

    // Connection counts for the admin screen
    broadcast::spawn_connection_stats(state.clone());

    let app = app::router(state, auth_config);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
