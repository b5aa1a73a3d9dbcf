//! Execution of `HttpRequest` values.
//!
//! # Design
//! The client is written once against the async [`Transport`] trait. The
//! two implementations differ in how they spend threads:
//!
//! - [`UreqTransport`] blocks the calling thread on every call and runs
//!   batches on a fixed pool of scoped worker threads. It is driven through
//!   [`crate::blocking::TrackerClient`].
//! - [`ReqwestTransport`] suspends on every call and keeps the default
//!   batch behaviour of one request after another.
//!
//! A transport is shared by every in-flight operation of a client and must
//! be safe to use concurrently.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

mod blocking;
mod suspending;

pub use blocking::UreqTransport;
pub use suspending::ReqwestTransport;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request. Any status code is a successful exchange; only
    /// failing to get an answer is an error.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Execute a batch and answer in submission order.
    ///
    /// The default runs the requests sequentially and stops at the first
    /// transport failure.
    async fn execute_all(
        &self,
        requests: Vec<HttpRequest>,
    ) -> Result<Vec<HttpResponse>, TransportError> {
        let mut responses = Vec::with_capacity(requests.len());
        for request in requests {
            responses.push(self.execute(request).await?);
        }
        Ok(responses)
    }
}
