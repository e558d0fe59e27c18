//! HTTP response handling.

use crate::client::ClientError;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use url::Url;

/// A fully buffered HTTP response.
///
/// Headers are kept exactly as received: repeated fields stay separate
/// values in arrival order and opaque (non UTF-8) values are not dropped.
#[derive(Clone, Debug)]
pub struct Response {
    /// Response status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Final URL (after redirects).
    pub url: Url,
    /// Response body.
    body: Bytes,
}

impl Response {
    /// Create a response.
    pub fn new(status: StatusCode, url: Url, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            url,
            body: body.into(),
        }
    }

    /// Add a header value, keeping any earlier values for the same name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Create a response from a reqwest response, buffering the body.
    pub(crate) async fn from_reqwest(response: reqwest::Response) -> Result<Self, ClientError> {
        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();

        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Response(e.to_string()))?;

        Ok(Self {
            status,
            headers,
            url,
            body,
        })
    }

    /// Get the response status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Check if the response was successful (2xx).
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header.
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Get the final URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get the body as UTF-8 text, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{CONTENT_TYPE, LINK};

    #[test]
    fn test_response_accessors() {
        let url = Url::parse("http://localhost:8089/style.css").unwrap();
        let response = Response::new(StatusCode::OK, url, "body { margin: 0 }")
            .with_header(CONTENT_TYPE, HeaderValue::from_static("text/css; charset=utf-8"));

        assert!(response.is_success());
        assert_eq!(response.header("content-type").unwrap(), "text/css; charset=utf-8");
        assert_eq!(response.text(), "body { margin: 0 }");
        assert_eq!(response.body().len(), 18);
    }

    #[test]
    fn test_repeated_and_opaque_headers_kept() {
        let url = Url::parse("http://localhost:8089/").unwrap();
        let opaque = HeaderValue::from_bytes(b"caf\xe9").unwrap();
        let response = Response::new(StatusCode::OK, url, "")
            .with_header(LINK, HeaderValue::from_static("</a.js>; rel=preload"))
            .with_header(LINK, HeaderValue::from_static("</b.js>; rel=preload"))
            .with_header(HeaderName::from_static("x-label"), opaque.clone());

        let links: Vec<_> = response.headers().get_all(LINK).iter().collect();
        assert_eq!(links, vec!["</a.js>; rel=preload", "</b.js>; rel=preload"]);
        assert_eq!(response.header("x-label"), Some(&opaque));
    }

    #[test]
    fn test_response_not_success() {
        let url = Url::parse("http://localhost:8089/missing.js").unwrap();
        let response = Response::new(StatusCode::NOT_FOUND, url, Bytes::new());
        assert!(!response.is_success());
        assert!(response.header("content-type").is_none());
    }
}
