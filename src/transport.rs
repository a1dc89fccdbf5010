//! HTTP transport used by the download workers.
//!
//! Workers only need "GET this URL and give me the body as a stream of
//! bytes", so that is all [`Transport`] exposes. [`ReqwestTransport`] is the
//! production implementation; tests plug in mocks.

use crate::{Error, Result};
use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use log::debug;
use std::future::Future;
use std::pin::Pin;

/// Response body as a stream of byte frames.
///
/// `None` marks a clean end of body. An `Err` item is a transport failure
/// distinct from end-of-stream.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Minimal HTTP client abstraction.
pub trait Transport: Send + Sync + 'static {
    /// Issues a GET for `url` and returns its body stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be established (DNS failure,
    /// connection refused, TLS error, ...). HTTP error statuses are not
    /// errors: the body is streamed regardless.
    fn get(&self, url: &str) -> impl Future<Output = Result<BodyStream>> + Send;
}

/// Transport backed by a `reqwest` client.
///
/// Each worker owns one of these. The idle pool keeps a single warm
/// connection per host so consecutive requests reuse it instead of
/// reconnecting.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client with a one-connection idle pool.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(1)
            .tcp_nodelay(true)
            .user_agent(concat!("http-download-speed/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<BodyStream> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            debug!("GET {} returned {}, counting body anyway", url, status);
        }

        Ok(Box::pin(response.bytes_stream().map_err(Error::from)))
    }
}
