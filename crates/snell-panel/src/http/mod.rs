//! HTTP surface: router, shared state and handlers.

pub mod handlers;
pub mod response;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{delete, get, post, put, MethodRouter},
    Router,
};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

use crate::middleware::{create_cors_layer, RequestTraceLayer, TokenAuthLayer};
use crate::service::PanelService;

/// Router settings taken from the process configuration.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Shared secret expected in the `token` query parameter.
    pub api_token: String,
    pub request_timeout: Duration,
    pub cors_origins: Vec<String>,
    /// Maximum accepted request body in bytes.
    pub body_limit: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            request_timeout: Duration::from_secs(30),
            cors_origins: vec!["*".to_string()],
            body_limit: 64 * 1024,
        }
    }
}

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PanelService>,
}

/// Build the panel router.
///
/// `/` and `/health` are public. Every other route requires the token. A
/// known path hit with the wrong method is treated like an unknown path.
pub fn build_router(service: Arc<PanelService>, settings: HttpSettings) -> Router {
    let state = AppState { service };
    let auth = TokenAuthLayer::new(settings.api_token.clone());
    let protected = |route: MethodRouter<AppState>| {
        route
            .route_layer(auth.clone())
            .fallback(handlers::not_found)
    };

    Router::new()
        .route("/", get(handlers::welcome).fallback(handlers::not_found))
        .route("/health", get(handlers::health).fallback(handlers::not_found))
        .route("/entry", protected(post(handlers::insert_entry)))
        .route("/entries", protected(get(handlers::list_entries)))
        .route("/entry/:ip", protected(delete(handlers::delete_by_ip)))
        .route(
            "/entry/node/:node_id",
            protected(delete(handlers::delete_by_node_id)),
        )
        .route("/modify/:node_id", protected(put(handlers::modify_by_node_id)))
        .route("/subscribe", protected(get(handlers::subscribe)))
        .fallback(handlers::not_found)
        .layer(RequestBodyLimitLayer::new(settings.body_limit))
        .layer(TimeoutLayer::new(settings.request_timeout))
        .layer(RequestTraceLayer::new())
        .layer(create_cors_layer(&settings.cors_origins))
        .with_state(state)
}
