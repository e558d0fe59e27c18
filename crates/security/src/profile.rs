//! Isolation profiles: which header set a delivery component enforces.

use crate::csp::ContentSecurityPolicy;
use crate::headers::{names, values, HeaderSet, HeaderSetError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Which header set to enforce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationProfile {
    /// COOP and COEP only.
    #[default]
    Baseline,
    /// Baseline plus HSTS, nosniff, frame denial and a CSP.
    Strict,
}

impl IsolationProfile {
    /// Build the header set for this profile.
    ///
    /// Fails only when the allow-list holds sources that are not valid
    /// header value text.
    pub fn header_set(&self, allow_list: &CspAllowList) -> Result<HeaderSet, HeaderSetError> {
        let set = HeaderSet::isolation();
        match self {
            IsolationProfile::Baseline => Ok(set),
            IsolationProfile::Strict => set
                .with(names::STRICT_TRANSPORT_SECURITY, values::HSTS)?
                .with(names::X_CONTENT_TYPE_OPTIONS, values::NOSNIFF)?
                .with(names::X_FRAME_OPTIONS, values::DENY)?
                .with(
                    names::CONTENT_SECURITY_POLICY,
                    &allow_list.policy().to_header_value(),
                ),
        }
    }

    /// Build the header set and append configured extra headers.
    pub fn header_set_with_extras(
        &self,
        allow_list: &CspAllowList,
        extras: &IndexMap<String, String>,
    ) -> Result<HeaderSet, HeaderSetError> {
        let mut set = self.header_set(allow_list)?;
        for (name, value) in extras {
            set.insert(name, value)?;
        }
        Ok(set)
    }
}

/// Source allow-list used to build the strict profile's CSP.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CspAllowList {
    pub default_src: Vec<String>,
    pub script_src: Vec<String>,
    pub style_src: Vec<String>,
    pub worker_src: Vec<String>,
    pub connect_src: Vec<String>,
}

impl Default for CspAllowList {
    fn default() -> Self {
        Self {
            default_src: vec!["'self'".to_string()],
            script_src: vec![
                "'self'".to_string(),
                "'wasm-unsafe-eval'".to_string(),
                "https://unpkg.com".to_string(),
            ],
            style_src: vec!["'self'".to_string(), "'unsafe-inline'".to_string()],
            worker_src: vec!["'self'".to_string(), "blob:".to_string()],
            connect_src: vec!["'self'".to_string(), "https://unpkg.com".to_string()],
        }
    }
}

impl CspAllowList {
    /// Build the policy; empty lists are omitted.
    pub fn policy(&self) -> ContentSecurityPolicy {
        [
            ("default-src", &self.default_src),
            ("script-src", &self.script_src),
            ("style-src", &self.style_src),
            ("worker-src", &self.worker_src),
            ("connect-src", &self.connect_src),
        ]
        .into_iter()
        .filter(|(_, sources)| !sources.is_empty())
        .fold(ContentSecurityPolicy::new(), |csp, (name, sources)| {
            csp.directive(name, sources.iter().cloned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::CspCheck;
    use url::Url;

    #[test]
    fn test_baseline_profile() {
        let set = IsolationProfile::Baseline
            .header_set(&CspAllowList::default())
            .unwrap();
        assert_eq!(set, HeaderSet::isolation());
    }

    #[test]
    fn test_strict_is_superset_of_baseline() {
        let allow = CspAllowList::default();
        let baseline = IsolationProfile::Baseline.header_set(&allow).unwrap();
        let strict = IsolationProfile::Strict.header_set(&allow).unwrap();

        assert!(strict.is_superset_of(&baseline));
        assert_eq!(strict.len(), 6);
        assert_eq!(&strict.names()[..2], &baseline.names()[..]);
        assert_eq!(strict.get("x-frame-options"), Some("DENY"));
        assert_eq!(strict.get("x-content-type-options"), Some("nosniff"));
        assert!(strict
            .get("content-security-policy")
            .unwrap()
            .contains("script-src 'self' 'wasm-unsafe-eval' https://unpkg.com"));
    }

    #[test]
    fn test_default_allow_list_permits_toolkit() {
        let policy = CspAllowList::default().policy();
        let document = Url::parse("https://editor.example.com/").unwrap();
        let toolkit = Url::parse("https://unpkg.com/@ffmpeg/ffmpeg@0.12.10/dist/umd/ffmpeg.js").unwrap();
        assert_eq!(policy.allows_script(&toolkit, &document), CspCheck::Allowed);

        let other = Url::parse("https://cdn.example.net/lib.js").unwrap();
        assert!(policy.allows_script(&other, &document).is_blocked());
    }

    #[test]
    fn test_empty_lists_omitted() {
        let allow = CspAllowList {
            default_src: vec!["'self'".to_string()],
            script_src: Vec::new(),
            style_src: Vec::new(),
            worker_src: Vec::new(),
            connect_src: Vec::new(),
        };
        assert_eq!(allow.policy().to_header_value(), "default-src 'self'");
    }

    #[test]
    fn test_extras_cannot_override_mandatory() {
        let mut extras = IndexMap::new();
        extras.insert("Cross-Origin-Opener-Policy".to_string(), "unsafe-none".to_string());
        let result = IsolationProfile::Baseline.header_set_with_extras(&CspAllowList::default(), &extras);
        assert!(matches!(result, Err(HeaderSetError::MandatoryConflict { .. })));

        let mut extras = IndexMap::new();
        extras.insert("Cross-Origin-Resource-Policy".to_string(), "same-origin".to_string());
        let set = IsolationProfile::Baseline
            .header_set_with_extras(&CspAllowList::default(), &extras)
            .unwrap();
        assert_eq!(set.get("cross-origin-resource-policy"), Some("same-origin"));
    }

    #[test]
    fn test_invalid_source_rejected() {
        let allow = CspAllowList {
            script_src: vec!["'self'\nX-Injected: 1".to_string()],
            ..CspAllowList::default()
        };
        assert!(matches!(
            IsolationProfile::Strict.header_set(&allow),
            Err(HeaderSetError::InvalidValue { .. })
        ));
        assert!(IsolationProfile::Baseline.header_set(&allow).is_ok());
    }

    #[test]
    fn test_profile_serde() {
        let profile: IsolationProfile = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(profile, IsolationProfile::Strict);
    }
}
