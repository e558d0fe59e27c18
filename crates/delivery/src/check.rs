//! Deployment check: headers on the manifest URLs plus a full agent install.

use crate::config::DeliveryConfig;
use cache::CacheStorage;
use delivery_security::{verify_isolation, HeaderMismatch, IsolationProfile};
use networking::{Fetch, Request};
use offline::Registration;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Header verification result for one manifest URL.
#[derive(Debug, Clone)]
pub struct HeaderReport {
    pub url: Url,
    /// `None` when the URL could not be fetched.
    pub status: Option<u16>,
    pub error: Option<String>,
    pub mismatches: Vec<HeaderMismatch>,
}

impl HeaderReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.mismatches.is_empty()
    }
}

/// Outcome of `coi-serve check`.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub base: Url,
    pub headers: Vec<HeaderReport>,
    /// Entries cached by the install, or why it failed.
    pub install: Result<usize, String>,
    /// Caches removed when the installed agent activated.
    pub purged: Vec<String>,
    /// Manifest URLs the strict profile's CSP would block.
    pub csp_warnings: Vec<String>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.install.is_ok() && self.headers.iter().all(HeaderReport::is_ok)
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Deployment check for {}", self.base)?;
        for report in &self.headers {
            let status = report
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "---".to_string());
            if let Some(error) = &report.error {
                writeln!(f, "  FAIL {} {}: {}", status, report.url, error)?;
            } else if report.mismatches.is_empty() {
                writeln!(f, "  ok   {} {}", status, report.url)?;
            } else {
                writeln!(f, "  FAIL {} {}", status, report.url)?;
                for mismatch in &report.mismatches {
                    writeln!(f, "         {}", mismatch)?;
                }
            }
        }
        match &self.install {
            Ok(entries) => writeln!(f, "  install: ok, {} entries cached", entries)?,
            Err(reason) => writeln!(f, "  install: FAILED, {}", reason)?,
        }
        for name in &self.purged {
            writeln!(f, "  activate: purged {}", name)?;
        }
        for warning in &self.csp_warnings {
            writeln!(f, "  csp: {}", warning)?;
        }
        Ok(())
    }
}

/// Check a running deployment at `base`.
///
/// Same-origin manifest URLs must carry both isolation headers. The
/// offline agent is then installed against a fresh in-memory cache storage
/// exactly as a browser would.
pub async fn run_check(base: &Url, config: &DeliveryConfig, network: Arc<dyn Fetch>) -> CheckReport {
    let urls = match config.offline.manifest.resolve(base) {
        Ok(urls) => urls,
        Err(err) => {
            return CheckReport {
                base: base.clone(),
                headers: Vec::new(),
                install: Err(err.to_string()),
                purged: Vec::new(),
                csp_warnings: Vec::new(),
            }
        }
    };

    let mut headers = Vec::new();
    for url in urls.iter().filter(|url| url.origin() == base.origin()) {
        headers.push(check_headers(network.as_ref(), url).await);
    }

    let registration = Registration::new(
        config.agent_config(base.clone()),
        Arc::new(CacheStorage::new()),
        network,
    );
    let (install, purged) = match registration.install().await {
        Ok(agent) => {
            let purged = agent.activate().iter().map(ToString::to_string).collect();
            (Ok(agent.cache().len()), purged)
        }
        Err(err) => (Err(err.to_string()), Vec::new()),
    };

    let csp_warnings = csp_warnings(config, base, &urls);
    for warning in &csp_warnings {
        warn!("{}", warning);
    }

    let report = CheckReport {
        base: base.clone(),
        headers,
        install,
        purged,
        csp_warnings,
    };
    info!(ok = report.is_ok(), "deployment check finished");
    report
}

async fn check_headers(network: &dyn Fetch, url: &Url) -> HeaderReport {
    match network.fetch(&Request::get(url.clone())).await {
        Ok(response) => {
            let mismatches = match verify_isolation(response.headers()) {
                Ok(()) => Vec::new(),
                Err(violation) => violation.mismatches,
            };
            HeaderReport {
                url: url.clone(),
                status: Some(response.status().as_u16()),
                error: None,
                mismatches,
            }
        }
        Err(err) => HeaderReport {
            url: url.clone(),
            status: None,
            error: Some(err.to_string()),
            mismatches: Vec::new(),
        },
    }
}

/// Third-party scripts the edge's CSP would refuse to load.
fn csp_warnings(config: &DeliveryConfig, base: &Url, urls: &[Url]) -> Vec<String> {
    if config.edge.profile != IsolationProfile::Strict {
        return Vec::new();
    }
    let policy = config.csp.policy();
    urls.iter()
        .filter(|url| url.origin() != base.origin() && url.path().ends_with(".js"))
        .filter(|url| policy.allows_script(url, base).is_blocked())
        .map(|url| format!("script-src does not allow {}", url))
        .collect()
}
