//! The edge request handler and its router.

use crate::error::EdgeError;
use crate::store::AssetStore;
use crate::Body;
use axum::extract::State;
use axum::Router;
use delivery_security::HeaderSet;
use http::{Request, Response, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Intercepts every request, delegates to the store and enforces the header set.
#[derive(Clone)]
pub struct EdgeHandler {
    store: Arc<dyn AssetStore>,
    headers: Arc<HeaderSet>,
}

impl EdgeHandler {
    pub fn new(store: Arc<dyn AssetStore>, headers: Arc<HeaderSet>) -> Self {
        Self { store, headers }
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Handle one request.
    ///
    /// Path and method reach the store as received. Every header set entry
    /// is stamped on the way out; other response headers are kept. A store
    /// failure becomes a 502 that still carries the header set.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let started = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let mut response = match self.store.fetch(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%method, %path, error = %err, "asset store failed");
                bad_gateway(&err)
            }
        };
        self.headers.apply(response.headers_mut());

        debug!(
            %method,
            %path,
            status = response.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "edge request"
        );
        response
    }
}

fn bad_gateway(err: &EdgeError) -> Response<Body> {
    let mut response = Response::new(Body::from(format!("Bad Gateway: {}", err)));
    *response.status_mut() = StatusCode::BAD_GATEWAY;
    response
}

/// Route every path through the handler.
pub fn router(handler: EdgeHandler) -> Router {
    Router::new().fallback(handle_any).with_state(handler)
}

async fn handle_any(State(handler): State<EdgeHandler>, request: Request<Body>) -> Response<Body> {
    handler.handle(request).await
}

/// Bind and serve until the task is dropped.
pub async fn serve(addr: SocketAddr, handler: EdgeHandler) -> Result<(), EdgeError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| EdgeError::BindFailed {
            reason: format!("{}: {}", addr, e),
        })?;

    info!(%addr, headers = ?handler.headers(), "edge handler listening");

    axum::serve(listener, router(handler))
        .await
        .map_err(|e| EdgeError::Internal {
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use delivery_security::{CspAllowList, IsolationProfile};
    use http::header::HeaderValue;
    use http::Method;
    use http_body_util::BodyExt;
    use proptest::prelude::*;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Method and URI of every request a store saw.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, String)>>,
    }

    /// Store that answers with a fixed status and extra headers.
    struct StaticStore {
        status: StatusCode,
        extra: Vec<(&'static str, &'static str)>,
        recorder: Recorder,
    }

    impl StaticStore {
        fn ok() -> Self {
            Self {
                status: StatusCode::OK,
                extra: vec![("content-type", "text/html")],
                recorder: Recorder::default(),
            }
        }
    }

    #[async_trait]
    impl AssetStore for StaticStore {
        async fn fetch(&self, request: Request<Body>) -> Result<Response<Body>, EdgeError> {
            self.recorder.seen.lock().unwrap().push((
                request.method().to_string(),
                request.uri().to_string(),
            ));
            let mut response = Response::new(Body::from("asset"));
            *response.status_mut() = self.status;
            for (name, value) in &self.extra {
                response
                    .headers_mut()
                    .append(*name, HeaderValue::from_static(*value));
            }
            Ok(response)
        }
    }

    struct FailingStore;

    #[async_trait]
    impl AssetStore for FailingStore {
        async fn fetch(&self, _request: Request<Body>) -> Result<Response<Body>, EdgeError> {
            Err(EdgeError::Upstream {
                url: "http://assets.internal/".to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    fn strict() -> Arc<HeaderSet> {
        Arc::new(
            IsolationProfile::Strict
                .header_set(&CspAllowList::default())
                .unwrap(),
        )
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn assert_carries(set: &HeaderSet, response: &Response<Body>) {
        for (name, value) in set.iter() {
            assert_eq!(response.headers().get(name), Some(value), "{}", name);
        }
    }

    #[tokio::test]
    async fn test_headers_added_and_existing_kept() {
        let store = Arc::new(StaticStore::ok());
        let handler = EdgeHandler::new(store, strict());

        let response = handler.handle(get("/index.html")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_carries(handler.headers(), &response);
        assert_eq!(response.headers()["content-type"], "text/html");
    }

    #[tokio::test]
    async fn test_enforced_value_overrides_store() {
        let store = Arc::new(StaticStore {
            status: StatusCode::OK,
            extra: vec![
                ("cross-origin-embedder-policy", "unsafe-none"),
                ("x-frame-options", "SAMEORIGIN"),
            ],
            recorder: Recorder::default(),
        });
        let handler = EdgeHandler::new(store, strict());

        let response = handler.handle(get("/")).await;
        let coep: Vec<_> = response
            .headers()
            .get_all("cross-origin-embedder-policy")
            .iter()
            .collect();
        assert_eq!(coep, vec!["require-corp"]);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn test_path_and_method_untouched() {
        let store = Arc::new(StaticStore::ok());
        let handler = EdgeHandler::new(store.clone(), Arc::new(HeaderSet::isolation()));

        let request = Request::builder()
            .method(Method::HEAD)
            .uri("/assets/../ffmpeg-core.wasm?x=1")
            .body(Body::empty())
            .unwrap();
        handler.handle(request).await;

        let seen = store.recorder.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![("HEAD".to_string(), "/assets/../ffmpeg-core.wasm?x=1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_store_error_status_passes_through() {
        let store = Arc::new(StaticStore {
            status: StatusCode::NOT_FOUND,
            extra: Vec::new(),
            recorder: Recorder::default(),
        });
        let handler = EdgeHandler::new(store, strict());

        let response = handler.handle(get("/missing.js")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_carries(handler.headers(), &response);
    }

    #[tokio::test]
    async fn test_store_failure_is_bad_gateway_with_headers() {
        let handler = EdgeHandler::new(Arc::new(FailingStore), strict());

        let response = handler.handle(get("/")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_carries(handler.headers(), &response);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&body).contains("connection refused"));
    }

    #[tokio::test]
    async fn test_router_serves_every_path() {
        let handler = EdgeHandler::new(Arc::new(StaticStore::ok()), strict());
        let app = router(handler.clone());

        for uri in ["/", "/sw.js", "/deeply/nested/path.wasm", "/manifest.json?x"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_carries(handler.headers(), &response);
        }
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handler = EdgeHandler::new(Arc::new(FailingStore), strict());
        let err = serve(addr, handler).await.unwrap_err();
        assert!(matches!(err, EdgeError::BindFailed { .. }));
    }

    proptest! {
        #[test]
        fn prop_every_path_carries_isolation(
            segments in proptest::collection::vec("[a-zA-Z0-9._-]{1,12}", 0..5),
            fail in any::<bool>(),
        ) {
            let uri = format!("/{}", segments.join("/"));
            let store: Arc<dyn AssetStore> = if fail {
                Arc::new(FailingStore)
            } else {
                Arc::new(StaticStore::ok())
            };
            let handler = EdgeHandler::new(store, Arc::new(HeaderSet::isolation()));

            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let response = runtime.block_on(router(handler).oneshot(get(&uri))).unwrap();

            prop_assert_eq!(&response.headers()["cross-origin-opener-policy"], "same-origin");
            prop_assert_eq!(&response.headers()["cross-origin-embedder-policy"], "require-corp");
        }
    }
}
