//! Response middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use delivery_security::HeaderSet;
use std::sync::Arc;
use std::time::Instant;

/// Stamp the header set on every response and log the request.
///
/// Runs outside all routes, so redirects, errors and the well-known
/// files are covered too.
pub async fn isolation_headers(
    State(headers): State<Arc<HeaderSet>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;
    headers.apply(response.headers_mut());

    tracing::debug!(
        %method,
        %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "origin request"
    );
    response
}
