//! Asset stores the edge handler delegates to.

use crate::error::EdgeError;
use crate::Body;
use async_trait::async_trait;
use http::header::{self, HeaderMap, HeaderName};
use http::{Request, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::debug;
use url::Url;

/// Largest request body forwarded upstream.
const MAX_FORWARD_BODY: usize = 16 * 1024 * 1024;

/// Headers scoped to a single connection; never forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Where the edge finds the bytes of an asset.
///
/// Stores return error statuses (404 and friends) as ordinary responses.
/// An `Err` means the store itself could not answer.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn fetch(&self, request: Request<Body>) -> Result<Response<Body>, EdgeError>;
}

#[async_trait]
impl<T: AssetStore + ?Sized> AssetStore for Arc<T> {
    async fn fetch(&self, request: Request<Body>) -> Result<Response<Body>, EdgeError> {
        (**self).fetch(request).await
    }
}

/// Forwards requests to an upstream origin over HTTP.
pub struct UpstreamStore {
    base: Url,
    client: reqwest::Client,
}

impl UpstreamStore {
    pub fn new(base: &str) -> Result<Self, EdgeError> {
        Self::with_timeout(base, Duration::from_secs(30))
    }

    pub fn with_timeout(base: &str, timeout: Duration) -> Result<Self, EdgeError> {
        let base = Url::parse(base).map_err(|e| EdgeError::InvalidUpstream {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(EdgeError::InvalidUpstream {
                url: base.to_string(),
                reason: "scheme must be http or https".to_string(),
            });
        }

        // Bodies and redirects pass through untouched.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .build()
            .map_err(|e| EdgeError::Internal {
                reason: e.to_string(),
            })?;

        Ok(Self { base, client })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Map an incoming path and query onto the upstream base.
    pub fn upstream_url(&self, uri: &http::Uri) -> Url {
        let mut url = self.base.clone();
        let path = format!("{}{}", self.base.path().trim_end_matches('/'), uri.path());
        url.set_path(&path);
        url.set_query(uri.query());
        url
    }
}

#[async_trait]
impl AssetStore for UpstreamStore {
    async fn fetch(&self, request: Request<Body>) -> Result<Response<Body>, EdgeError> {
        let (parts, body) = request.into_parts();
        let url = self.upstream_url(&parts.uri);

        let body = axum::body::to_bytes(body, MAX_FORWARD_BODY)
            .await
            .map_err(|e| EdgeError::Body(e.to_string()))?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);

        debug!(method = %parts.method, url = %url, "forwarding upstream");

        let upstream = self
            .client
            .request(parts.method, url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| EdgeError::Upstream {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        strip_hop_by_hop(&mut response_headers);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Serves assets from a local directory.
#[derive(Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    serve_dir: ServeDir,
}

impl DirectoryStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            serve_dir: ServeDir::new(&root),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl AssetStore for DirectoryStore {
    async fn fetch(&self, request: Request<Body>) -> Result<Response<Body>, EdgeError> {
        let response = self
            .serve_dir
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| EdgeError::Internal {
                reason: e.to_string(),
            })?;
        Ok(response.map(Body::new))
    }
}
