//! CORS layer built from the allowed-origin list.
//!
//! Browser clients may call every panel route: GET, POST, PUT, DELETE and
//! OPTIONS, with the Origin, Content-Type and Accept headers.

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

pub fn create_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT]);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o.trim() == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}
