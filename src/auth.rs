//! HTTP Basic Authentication for the admin screen and admin socket

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use crate::types::Role;
use crate::ws::{parse_role, WsQuery};

/// Authentication configuration
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Username for the admin screen (None = auth disabled)
    pub username: Option<String>,
    /// Password for the admin screen
    pub password: Option<String>,
}

fn env_credential(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl AuthConfig {
    /// Load auth config from environment variables
    /// ADMIN_USERNAME and ADMIN_PASSWORD must both be set to enable auth
    pub fn from_env() -> Self {
        let username = env_credential("ADMIN_USERNAME");
        let password = env_credential("ADMIN_PASSWORD");

        if username.is_some() && password.is_some() {
            tracing::info!("Admin authentication enabled");
            Self { username, password }
        } else {
            if username.is_some() || password.is_some() {
                tracing::warn!(
                    "ADMIN_USERNAME and ADMIN_PASSWORD must both be set to enable authentication"
                );
            }
            tracing::warn!("Admin authentication DISABLED - anyone can run the game!");
            Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Validate credentials
    pub fn validate(&self, username: &str, password: &str) -> bool {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => {
                constant_time_eq(u.as_bytes(), username.as_bytes())
                    && constant_time_eq(p.as_bytes(), password.as_bytes())
            }
            _ => true, // Auth disabled, allow all
        }
    }

    /// Check an `Authorization: Basic ...` header value
    fn accepts_header(&self, value: &str) -> bool {
        let Some(encoded) = value.strip_prefix("Basic ") else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(credentials) = String::from_utf8(decoded) else {
            return false;
        };
        credentials
            .split_once(':')
            .is_some_and(|(username, password)| self.validate(username, password))
    }

    fn accepts(&self, request: &Request<Body>) -> bool {
        request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .is_some_and(|value| self.accepts_header(value))
    }
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

fn unauthorized(realm: &'static str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, realm)],
        "Unauthorized",
    )
        .into_response()
}

/// Middleware for HTTP Basic Authentication on admin routes
pub async fn admin_auth_middleware(
    State(auth_config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !auth_config.is_enabled() || auth_config.accepts(&request) {
        return next.run(request).await;
    }
    unauthorized("Basic realm=\"Quizparty Admin\"")
}

/// Whether the socket handler would grant this request the admin role.
///
/// Reads the query the same way `ws_handler` does, percent-decoding included.
fn requests_admin_socket(request: &Request<Body>) -> bool {
    if request.uri().path() != "/ws" {
        return false;
    }
    match Query::<WsQuery>::try_from_uri(request.uri()) {
        Ok(Query(params)) => parse_role(params.role.as_deref()) == Role::Admin,
        Err(_) => false,
    }
}

/// Middleware to require HTTP Basic Auth for admin WebSocket connections.
///
/// Without it anyone could take over the game by connecting to `/ws?role=admin`.
pub async fn admin_ws_auth_middleware(
    State(auth_config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !requests_admin_socket(&request) {
        return next.run(request).await;
    }

    if !auth_config.is_enabled() {
        tracing::warn!(
            "Admin WebSocket requested but admin authentication is DISABLED; set ADMIN_USERNAME and ADMIN_PASSWORD"
        );
        return next.run(request).await;
    }

    if auth_config.accepts(&request) {
        return next.run(request).await;
    }
    unauthorized("Basic realm=\"Quizparty Admin (WebSocket)\"")
}

/// Serve a page from the static directory
async fn serve_page(path: &str, missing: &'static str) -> Response {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            content,
        )
            .into_response(),
        Err(e) => {
            tracing::debug!("Could not read {}: {}", path, e);
            (StatusCode::NOT_FOUND, missing).into_response()
        }
    }
}

/// Handler to serve admin.html (used with auth middleware)
pub async fn serve_admin() -> Response {
    serve_page("static/admin.html", "Admin page not found").await
}
