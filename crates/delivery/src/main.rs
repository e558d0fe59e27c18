//! coi-serve - cross-origin isolated asset delivery.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use url::Url;

use delivery::{run_check, DeliveryConfig};
use delivery_security::IsolationProfile;
use edge::{AssetStore, DirectoryStore, EdgeHandler, UpstreamStore};
use networking::HttpClient;
use origin::OriginServer;

/// coi-serve - serve a browser bundle with cross-origin isolation headers
#[derive(Parser, Debug)]
#[command(name = "coi-serve", author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the asset tree from disk
    Origin(OriginArgs),
    /// Run the edge handler in front of an asset store
    Edge(EdgeArgs),
    /// Verify a running deployment and install the offline agent against it
    Check(CheckArgs),
}

#[derive(clap::Args, Debug)]
struct OriginArgs {
    /// Port to bind
    #[arg(long)]
    port: Option<u16>,

    /// Interface to bind
    #[arg(long)]
    host: Option<IpAddr>,

    /// Asset tree root
    #[arg(long)]
    root: Option<PathBuf>,

    /// File served at /sw.js
    #[arg(long)]
    service_worker: Option<PathBuf>,

    /// File served at /manifest.json
    #[arg(long)]
    web_manifest: Option<PathBuf>,

    /// Send the strict header profile instead of the baseline one
    #[arg(long)]
    strict: bool,

    /// Skip the loopback header check after binding
    #[arg(long)]
    skip_self_check: bool,
}

#[derive(clap::Args, Debug)]
struct EdgeArgs {
    /// Port to bind
    #[arg(long)]
    port: Option<u16>,

    /// Interface to bind
    #[arg(long)]
    host: Option<IpAddr>,

    /// Upstream origin to forward to
    #[arg(long, conflicts_with = "root")]
    upstream: Option<String>,

    /// Local bundle directory
    #[arg(long)]
    root: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct CheckArgs {
    /// Base URL of the deployment
    #[arg(long, default_value = "http://localhost:8089/")]
    base_url: Url,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let fallback = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to initialize logging: {}", err);
    }

    if let Err(err) = run(args).await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    info!("coi-serve v{}", delivery::VERSION);

    let mut config = match &args.config {
        Some(path) => DeliveryConfig::load(path)?,
        None => DeliveryConfig::default(),
    };
    config.apply_env()?;

    match args.command {
        Command::Origin(origin_args) => run_origin(config, origin_args).await,
        Command::Edge(edge_args) => run_edge(config, edge_args).await,
        Command::Check(check_args) => run_check_command(config, check_args).await,
    }
}

async fn run_origin(mut config: DeliveryConfig, args: OriginArgs) -> Result<()> {
    if let Some(port) = args.port {
        config.origin.port = port;
    }
    if let Some(host) = args.host {
        config.origin.host = host;
    }
    if let Some(root) = args.root {
        config.origin.root = root;
    }
    if args.service_worker.is_some() {
        config.origin.service_worker = args.service_worker;
    }
    if args.web_manifest.is_some() {
        config.origin.web_manifest = args.web_manifest;
    }
    if args.strict {
        config.origin.profile = IsolationProfile::Strict;
    }
    if args.skip_self_check {
        config.origin.self_check = false;
    }

    let headers = Arc::new(config.origin_headers()?);
    info!(profile = ?config.origin.profile, "origin headers:\n{}", headers);

    OriginServer::new(config.origin_config(), headers)
        .run()
        .await
        .context("origin server stopped")
}

async fn run_edge(mut config: DeliveryConfig, args: EdgeArgs) -> Result<()> {
    if let Some(port) = args.port {
        config.edge.port = port;
    }
    if let Some(host) = args.host {
        config.edge.host = host;
    }
    if args.upstream.is_some() {
        config.edge.upstream = args.upstream;
        config.edge.root = None;
    }
    if args.root.is_some() {
        config.edge.root = args.root;
        config.edge.upstream = None;
    }

    let store: Arc<dyn AssetStore> = match (&config.edge.upstream, &config.edge.root) {
        (Some(upstream), _) => Arc::new(UpstreamStore::new(upstream)?),
        (None, Some(root)) => Arc::new(DirectoryStore::new(root)),
        (None, None) => bail!("edge needs either --upstream or --root"),
    };

    let headers = Arc::new(config.edge_headers()?);
    let addr = SocketAddr::new(config.edge.host, config.edge.port);

    edge::serve(addr, EdgeHandler::new(store, headers))
        .await
        .context("edge handler stopped")
}

async fn run_check_command(config: DeliveryConfig, args: CheckArgs) -> Result<()> {
    let network = Arc::new(HttpClient::new()?);
    let report = run_check(&args.base_url, &config, network).await;
    println!("{}", report);

    if !report.is_ok() {
        bail!("deployment check failed for {}", args.base_url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_origin_defaults() {
        let args = Args::parse_from(["coi-serve", "origin"]);
        assert!(!args.verbose);
        assert!(args.config.is_none());
        match args.command {
            Command::Origin(origin) => {
                assert!(origin.port.is_none());
                assert!(!origin.strict);
                assert!(!origin.skip_self_check);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_args_origin_flags() {
        let args = Args::parse_from([
            "coi-serve",
            "-v",
            "origin",
            "--port",
            "9000",
            "--root",
            "dist",
            "--strict",
            "--skip-self-check",
        ]);
        assert!(args.verbose);
        match args.command {
            Command::Origin(origin) => {
                assert_eq!(origin.port, Some(9000));
                assert_eq!(origin.root, Some(PathBuf::from("dist")));
                assert!(origin.strict);
                assert!(origin.skip_self_check);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_args_edge_store_choice() {
        let args = Args::parse_from(["coi-serve", "edge", "--upstream", "http://origin:8089"]);
        match args.command {
            Command::Edge(edge) => assert_eq!(edge.upstream.as_deref(), Some("http://origin:8089")),
            other => panic!("unexpected command: {:?}", other),
        }

        let conflict = Args::try_parse_from([
            "coi-serve",
            "edge",
            "--upstream",
            "http://origin:8089",
            "--root",
            "dist",
        ]);
        assert!(conflict.is_err());
    }

    #[test]
    fn test_args_check() {
        let args = Args::parse_from(["coi-serve", "check", "--config", "delivery.json"]);
        assert_eq!(args.config, Some(PathBuf::from("delivery.json")));
        match args.command {
            Command::Check(check) => assert_eq!(check.base_url.as_str(), "http://localhost:8089/"),
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(Args::try_parse_from(["coi-serve", "check", "--base-url", "not a url"]).is_err());
    }
}
