//! Request tracing middleware.
//!
//! Opens an `http_request` span per request and logs the outcome with its
//! status and latency. Query strings are left out of the span so the API
//! token never reaches the logs.

use std::task::{Context, Poll};
use std::time::Instant;

use axum::{body::Body, http::Request, response::Response};
use tower::{Layer, Service};
use tracing::{info, info_span, warn, Instrument};

/// Tracing layer that creates spans for each request
#[derive(Clone, Default)]
pub struct RequestTraceLayer;

impl RequestTraceLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestTraceLayer {
    type Service = RequestTraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTraceService { inner }
    }
}

#[derive(Clone)]
pub struct RequestTraceService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestTraceService<S>
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
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let span = info_span!(
            "http_request",
            http.method = %req.method(),
            http.target = %req.uri().path(),
            http.status = tracing::field::Empty,
        );
        let started = Instant::now();

        Box::pin(
            async move {
                let result = inner.call(req).await;

                if let Ok(response) = &result {
                    let status = response.status();
                    let latency_ms = started.elapsed().as_millis() as u64;
                    tracing::Span::current().record("http.status", status.as_u16());
                    if status.is_server_error() {
                        warn!(status = status.as_u16(), latency_ms, "Request failed");
                    } else {
                        info!(status = status.as_u16(), latency_ms, "Request completed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}
