//! Origin routes: the well-known files and the static asset tree.

use crate::listing;
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

/// Path of the offline agent script.
pub const SERVICE_WORKER_PATH: &str = "/sw.js";
/// Path of the web-app manifest.
pub const WEB_MANIFEST_PATH: &str = "/manifest.json";

/// Shared state of the static tree handler.
#[derive(Clone)]
pub struct StaticTree {
    root: Arc<PathBuf>,
    serve_dir: ServeDir,
}

impl StaticTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            serve_dir: ServeDir::new(&root),
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Build the route table.
///
/// The well-known files are served from their configured locations and
/// never looked up in the tree.
pub fn router(tree: StaticTree, service_worker: &Path, web_manifest: &Path) -> Router {
    Router::new()
        .route_service(SERVICE_WORKER_PATH, ServeFile::new(service_worker))
        .route_service(WEB_MANIFEST_PATH, ServeFile::new(web_manifest))
        .fallback(serve_tree)
        .with_state(tree)
}

/// Serve a path from the asset tree.
pub async fn serve_tree(State(tree): State<StaticTree>, request: Request<Body>) -> Response {
    let raw_path = request.uri().path().to_string();
    let decoded = match urlencoding::decode(&raw_path) {
        Ok(path) => path.into_owned(),
        Err(_) => return plain(StatusCode::BAD_REQUEST, "Bad request path"),
    };

    if is_traversal(&decoded) {
        tracing::warn!(path = %raw_path, "rejected path traversal");
        return plain(StatusCode::FORBIDDEN, "Forbidden");
    }

    let fs_path = tree.root.join(decoded.trim_start_matches('/'));
    let is_dir = tokio::fs::metadata(&fs_path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    if is_dir {
        if !decoded.ends_with('/') {
            let location = match request.uri().query() {
                Some(query) => format!("{}/?{}", raw_path, query),
                None => format!("{}/", raw_path),
            };
            return redirect(&location);
        }
        if !fs_path.join("index.html").is_file() {
            return list_directory(&decoded, &fs_path);
        }
    }

    match tree.serve_dir.clone().oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(infallible) => match infallible {},
    }
}

/// Whether a decoded path climbs out of the root.
pub fn is_traversal(decoded: &str) -> bool {
    decoded.split(['/', '\\']).any(|segment| segment == "..")
}

fn list_directory(url_path: &str, dir: &Path) -> Response {
    match listing::read_entries(dir) {
        Ok(entries) => (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            listing::render(url_path, &entries),
        )
            .into_response(),
        Err(err) => {
            tracing::debug!(path = %url_path, error = %err, "directory not listable");
            plain(StatusCode::NOT_FOUND, "No permission to list directory")
        }
    }
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(_) => plain(StatusCode::BAD_REQUEST, "Bad request path"),
    }
}

fn plain(status: StatusCode, message: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], message).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traversal_detection() {
        assert!(is_traversal("/../etc/passwd"));
        assert!(is_traversal("/assets/../../x"));
        assert!(is_traversal("/assets\\..\\x"));
        assert!(!is_traversal("/assets/..hidden"));
        assert!(!is_traversal("/a.b/c..d"));
        assert!(!is_traversal("/"));
    }
}
