//! Loopback request verifying the server really sends the isolation headers.

use crate::error::OriginError;
use delivery_security::verify_isolation;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use url::Url;

/// The URL a local client reaches a listener on.
pub fn loopback_url(addr: SocketAddr) -> Result<Url, OriginError> {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    let host = match ip {
        IpAddr::V4(ip) => ip.to_string(),
        IpAddr::V6(ip) => format!("[{}]", ip),
    };
    let url = format!("http://{}:{}/", host, addr.port());
    Url::parse(&url).map_err(|e| OriginError::Internal {
        reason: format!("loopback url {}: {}", url, e),
    })
}

/// GET `url` and require both mandatory headers with their exact values.
pub async fn run(url: &Url) -> Result<(), OriginError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|e| OriginError::Internal {
            reason: e.to_string(),
        })?;

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| OriginError::SelfCheckUnreachable {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    verify_isolation(response.headers())?;
    tracing::info!(url = %url, status = response.status().as_u16(), "self-check passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_url() {
        let addr: SocketAddr = "0.0.0.0:8089".parse().unwrap();
        assert_eq!(loopback_url(addr).unwrap().as_str(), "http://127.0.0.1:8089/");

        let addr: SocketAddr = "[::]:9000".parse().unwrap();
        assert_eq!(loopback_url(addr).unwrap().as_str(), "http://[::1]:9000/");

        let addr: SocketAddr = "192.168.1.20:8089".parse().unwrap();
        assert_eq!(loopback_url(addr).unwrap().as_str(), "http://192.168.1.20:8089/");
    }

    #[tokio::test]
    async fn test_unreachable() {
        let url = Url::parse("http://127.0.0.1:1/").unwrap();
        assert!(matches!(
            run(&url).await,
            Err(OriginError::SelfCheckUnreachable { .. })
        ));
    }
}
