//! Cache keys.

use networking::Request;
use std::fmt;
use url::Url;

/// Normalized request identity: method plus URL without fragment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    method: String,
    url: String,
}

impl RequestKey {
    pub fn new(method: &http::Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.as_str().to_ascii_uppercase(),
            url: url.into(),
        }
    }

    pub fn from_request(request: &Request) -> Self {
        Self::new(&request.method, &request.url)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_fragment_ignored() {
        let a = Url::parse("http://localhost:8089/index.html#timeline").unwrap();
        let b = Url::parse("http://localhost:8089/index.html").unwrap();
        assert_eq!(RequestKey::new(&Method::GET, &a), RequestKey::new(&Method::GET, &b));
    }

    #[test]
    fn test_method_distinguishes() {
        let url = Url::parse("http://localhost:8089/style.css").unwrap();
        assert_ne!(RequestKey::new(&Method::GET, &url), RequestKey::new(&Method::HEAD, &url));
    }

    #[test]
    fn test_query_kept() {
        let a = Url::parse("http://localhost:8089/app.js?v=1").unwrap();
        let b = Url::parse("http://localhost:8089/app.js?v=2").unwrap();
        assert_ne!(RequestKey::new(&Method::GET, &a), RequestKey::new(&Method::GET, &b));
        assert_eq!(
            RequestKey::new(&Method::GET, &a).to_string(),
            "GET http://localhost:8089/app.js?v=1"
        );
    }
}
