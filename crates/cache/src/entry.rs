//! Stored responses.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use networking::Response;
use url::Url;

/// A captured response. Never mutated once stored.
#[derive(Clone, Debug)]
pub struct CachedResponse {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub data: Bytes,
}

impl CachedResponse {
    /// Capture a network response.
    pub fn from_response(response: &Response) -> Self {
        Self {
            url: response.url().clone(),
            status: response.status(),
            headers: response.headers().clone(),
            data: response.body().clone(),
        }
    }

    /// Rebuild a response identical to the captured one.
    pub fn to_response(&self) -> Response {
        let mut response = Response::new(self.status, self.url.clone(), self.data.clone());
        response.headers = self.headers.clone();
        response
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}
