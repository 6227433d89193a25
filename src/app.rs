//! HTTP router: WebSocket endpoint, admin pages and the content API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::auth::{self, AuthConfig};
use crate::state::AppState;
use crate::{api, ws};

pub fn router(state: Arc<AppState>, auth_config: Arc<AuthConfig>) -> Router {
    // Protected admin routes (with HTTP Basic Auth)
    let admin_routes = Router::new()
        .route("/admin", get(auth::serve_admin))
        .route("/api/content/export", get(api::export_content))
        .route("/api/content/import", post(api::import_content))
        .layer(middleware::from_fn_with_state(
            auth_config.clone(),
            auth::admin_auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/api/questions/{id}/answers", get(api::question_answers))
        .route("/api/evaluate", post(api::evaluate));

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .layer(middleware::from_fn_with_state(
            auth_config,
            auth::admin_ws_auth_middleware,
        ));

    Router::new()
        .merge(ws_routes)
        .merge(admin_routes)
        .merge(api_routes)
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
