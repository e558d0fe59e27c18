//! Content Security Policy construction and checks.

use indexmap::IndexMap;
use std::fmt;
use url::Url;

/// Content Security Policy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentSecurityPolicy {
    /// Directives in declaration order.
    directives: IndexMap<String, CspDirective>,
}

impl ContentSecurityPolicy {
    /// Create a new empty CSP.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directive with the given source list.
    pub fn directive<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        self.directives
            .insert(name.to_lowercase(), CspDirective::new(name, values));
        self
    }

    /// Serialize to a header value.
    pub fn to_header_value(&self) -> String {
        self.directives
            .values()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Check if a script source is allowed for a document at `document`.
    pub fn allows_script(&self, url: &Url, document: &Url) -> CspCheck {
        self.check_source("script-src", url, document)
    }

    fn check_source(&self, directive_name: &str, url: &Url, document: &Url) -> CspCheck {
        let directive = match self.get_effective_directive(directive_name) {
            Some(d) => d,
            None => return CspCheck::Allowed,
        };

        if directive.matches_url(url, document) {
            return CspCheck::Allowed;
        }

        CspCheck::Blocked(CspViolation {
            directive: directive_name.to_string(),
            blocked_uri: url.to_string(),
        })
    }

    /// Fetch directives fall back to `default-src`.
    fn get_effective_directive(&self, name: &str) -> Option<&CspDirective> {
        self.directives
            .get(name)
            .or_else(|| self.directives.get("default-src"))
    }
}

impl fmt::Display for ContentSecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

/// CSP directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CspDirective {
    name: String,
    values: Vec<String>,
    sources: Vec<CspSource>,
}

impl CspDirective {
    /// Create a new directive.
    pub fn new(name: &str, values: Vec<String>) -> Self {
        let sources = values.iter().map(|v| CspSource::parse(v)).collect();
        Self {
            name: name.to_lowercase(),
            values,
            sources,
        }
    }

    /// Check if a URL matches any source of this directive.
    pub fn matches_url(&self, url: &Url, document: &Url) -> bool {
        self.sources.iter().any(|s| s.matches_url(url, document))
    }
}

impl fmt::Display for CspDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for value in &self.values {
            write!(f, " {}", value)?;
        }
        Ok(())
    }
}

/// CSP source expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CspSource {
    /// 'none' - nothing allowed
    None,
    /// 'self' - same origin as the document
    Self_,
    /// 'unsafe-inline'
    UnsafeInline,
    /// 'unsafe-eval'
    UnsafeEval,
    /// 'wasm-unsafe-eval'
    WasmUnsafeEval,
    /// Scheme source (e.g., "blob:")
    Scheme(String),
    /// Host source (e.g., "unpkg.com", "https://*.example.com")
    Host {
        scheme: Option<String>,
        host: String,
        port: Option<u16>,
        path: Option<String>,
    },
    /// Anything else (nonces, hashes, unknown keywords).
    Other(String),
}

impl CspSource {
    /// Parse a source expression.
    pub fn parse(source: &str) -> Self {
        match source.to_lowercase().as_str() {
            "'none'" => CspSource::None,
            "'self'" => CspSource::Self_,
            "'unsafe-inline'" => CspSource::UnsafeInline,
            "'unsafe-eval'" => CspSource::UnsafeEval,
            "'wasm-unsafe-eval'" => CspSource::WasmUnsafeEval,
            s if s.starts_with('\'') => CspSource::Other(s.to_string()),
            s if s.ends_with(':') => CspSource::Scheme(s[..s.len() - 1].to_string()),
            s => Self::parse_host(s),
        }
    }

    fn parse_host(source: &str) -> Self {
        let mut scheme = None;
        let mut rest = source;

        if let Some(idx) = rest.find("://") {
            scheme = Some(rest[..idx].to_string());
            rest = &rest[idx + 3..];
        }

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], Some(rest[idx..].to_string())),
            None => (rest, None),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => match p.parse::<u16>() {
                Ok(port) => (h, Some(port)),
                Err(_) => (authority, None),
            },
            None => (authority, None),
        };

        CspSource::Host {
            scheme,
            host: host.to_string(),
            port,
            path,
        }
    }

    /// Check if this source matches a URL loaded by a document at `document`.
    pub fn matches_url(&self, url: &Url, document: &Url) -> bool {
        match self {
            CspSource::Self_ => url.origin() == document.origin(),
            CspSource::Scheme(scheme) => url.scheme() == scheme,
            CspSource::Host {
                scheme,
                host,
                port,
                path,
            } => {
                match scheme {
                    Some(s) if url.scheme() != s => return false,
                    // A bare host inherits the document's scheme (with http -> https upgrade)
                    None if url.scheme() != document.scheme()
                        && !(document.scheme() == "http" && url.scheme() == "https") =>
                    {
                        return false
                    }
                    _ => {}
                }

                let url_host = url.host_str().unwrap_or("");
                if let Some(suffix) = host.strip_prefix("*.") {
                    if !url_host.ends_with(&format!(".{}", suffix)) {
                        return false;
                    }
                } else if host != "*" && url_host != host {
                    return false;
                }

                if let Some(p) = port {
                    if url.port_or_known_default() != Some(*p) {
                        return false;
                    }
                }

                if let Some(p) = path {
                    let matched = if p.ends_with('/') {
                        url.path().starts_with(p.as_str())
                    } else {
                        url.path() == p
                    };
                    if !matched {
                        return false;
                    }
                }

                true
            }
            _ => false,
        }
    }
}

/// Result of a CSP check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CspCheck {
    /// The resource is allowed.
    Allowed,
    /// The resource is blocked.
    Blocked(CspViolation),
}

impl CspCheck {
    pub fn is_blocked(&self) -> bool {
        matches!(self, CspCheck::Blocked(_))
    }
}

/// CSP violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CspViolation {
    /// The directive that was violated.
    pub directive: String,
    /// The URI that was blocked.
    pub blocked_uri: String,
}
