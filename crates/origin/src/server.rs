//! Origin server configuration, binding and lifecycle.

use crate::error::OriginError;
use crate::manifest_check;
use crate::middleware::isolation_headers;
use crate::routes::{self, StaticTree, SERVICE_WORKER_PATH, WEB_MANIFEST_PATH};
use crate::self_check;
use axum::{middleware, Router};
use cache::AssetManifest;
use delivery_security::HeaderSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Default port for the origin server
pub const DEFAULT_ORIGIN_PORT: u16 = 8089;

/// Origin server configuration
#[derive(Clone, Debug)]
pub struct OriginConfig {
    /// Interface to bind
    pub host: IpAddr,
    /// Port to bind
    pub port: u16,
    /// Directory holding the asset tree
    pub root: PathBuf,
    /// File served at `/sw.js`
    pub service_worker: PathBuf,
    /// File served at `/manifest.json`
    pub web_manifest: PathBuf,
    /// Verify the headers with a loopback request after binding
    pub self_check: bool,
    /// Manifest the tree is checked against at startup
    pub manifest: AssetManifest,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

impl OriginConfig {
    /// Serve `root`, with the well-known files taken from inside it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_ORIGIN_PORT,
            service_worker: root.join("sw.js"),
            web_manifest: root.join("manifest.json"),
            root,
            self_check: true,
            manifest: AssetManifest::default(),
        }
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_service_worker(mut self, path: impl Into<PathBuf>) -> Self {
        self.service_worker = path.into();
        self
    }

    pub fn with_web_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.web_manifest = path.into();
        self
    }

    pub fn with_self_check(mut self, enabled: bool) -> Self {
        self.self_check = enabled;
        self
    }

    pub fn with_manifest(mut self, manifest: AssetManifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Origin delivery server
pub struct OriginServer {
    config: OriginConfig,
    headers: Arc<HeaderSet>,
}

impl OriginServer {
    pub fn new(config: OriginConfig, headers: Arc<HeaderSet>) -> Self {
        Self { config, headers }
    }

    pub fn config(&self) -> &OriginConfig {
        &self.config
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Build the router with all routes and the header middleware
    pub fn build_router(&self) -> Router {
        routes::router(
            StaticTree::new(self.config.root.clone()),
            &self.config.service_worker,
            &self.config.web_manifest,
        )
        .layer(middleware::from_fn_with_state(
            self.headers.clone(),
            isolation_headers,
        ))
    }

    /// Number of manifest paths the tree cannot serve, each logged as a warning.
    pub fn check_manifest(&self) -> usize {
        let well_known = [
            (SERVICE_WORKER_PATH, self.config.service_worker.as_path()),
            (WEB_MANIFEST_PATH, self.config.web_manifest.as_path()),
        ];
        manifest_check::warn_missing(&self.config.manifest, &self.config.root, &well_known)
    }

    /// Bind the listening socket.
    pub async fn bind(&self) -> Result<BoundOrigin, OriginError> {
        if !self.config.root.is_dir() {
            return Err(OriginError::RootMissing {
                path: self.config.root.clone(),
            });
        }

        let addr = self.config.addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| OriginError::BindFailed {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?;
        let local_addr = listener.local_addr()?;

        Ok(BoundOrigin {
            listener,
            router: self.build_router(),
            local_addr,
        })
    }

    /// Bind, self-check and serve until the server stops.
    pub async fn run(self) -> Result<(), OriginError> {
        let missing = self.check_manifest();
        if missing > 0 {
            tracing::warn!(missing, "asset tree does not cover the offline manifest");
        }

        let bound = self.bind().await?;
        let local_addr = bound.local_addr();
        tracing::info!(
            addr = %local_addr,
            root = %self.config.root.display(),
            "origin server listening"
        );

        let server = tokio::spawn(bound.serve());

        if self.config.self_check {
            let checked = match self_check::loopback_url(local_addr) {
                Ok(url) => self_check::run(&url).await,
                Err(err) => Err(err),
            };
            if let Err(err) = checked {
                server.abort();
                return Err(err);
            }
        }

        server.await.map_err(|e| OriginError::Internal {
            reason: e.to_string(),
        })?
    }
}

/// A bound origin server that has not started accepting yet.
pub struct BoundOrigin {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl BoundOrigin {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn serve(self) -> Result<(), OriginError> {
        axum::serve(self.listener, self.router)
            .await
            .map_err(|e| OriginError::Internal {
                reason: e.to_string(),
            })
    }
}
