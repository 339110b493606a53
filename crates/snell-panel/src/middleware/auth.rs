//! Shared-secret authentication.
//!
//! Protected routes require `?token=<API_TOKEN>`. The comparison is constant
//! time.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::Query,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::domain::response::ApiResponse;

/// Authentication layer
#[derive(Clone)]
pub struct TokenAuthLayer {
    token: Arc<str>,
}

impl TokenAuthLayer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::from(token.into()),
        }
    }
}

impl<S> Layer<S> for TokenAuthLayer {
    type Service = TokenAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TokenAuthService {
            inner,
            token: Arc::clone(&self.token),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct TokenAuthService<S> {
    inner: S,
    token: Arc<str>,
}

impl<S> Service<Request<Body>> for TokenAuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let token = Arc::clone(&self.token);
        // Take the instance that was driven to readiness, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            if !has_valid_token(&req, &token) {
                warn!(path = %req.uri().path(), "Rejected request with missing or invalid token");
                return Ok(unauthorized_response());
            }
            debug!(path = %req.uri().path(), "Token accepted");
            inner.call(req).await
        })
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Check the `token` query parameter against the configured secret.
fn has_valid_token<B>(req: &Request<B>, expected: &str) -> bool {
    Query::<TokenQuery>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(q)| q.token)
        .is_some_and(|provided| constant_time_compare(&provided, expected))
}

/// Constant-time string comparison.
///
/// Both inputs are padded to the longer length with different filler bytes,
/// and the length check is folded into the same constant-time result.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    let max_len = std::cmp::max(a.len(), b.len());

    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];

    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}

fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error("Unauthorized")),
    )
        .into_response()
}
