//! The network collaborator seam.

use crate::client::ClientError;
use crate::request::Request;
use crate::response::Response;
use async_trait::async_trait;
use std::sync::Arc;

/// Something that can resolve a request over the network.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, ClientError>;
}

#[async_trait]
impl<T: Fetch + ?Sized> Fetch for Arc<T> {
    async fn fetch(&self, request: &Request) -> Result<Response, ClientError> {
        (**self).fetch(request).await
    }
}
