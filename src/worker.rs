//! Download worker: one unbounded GET-and-drain loop.
//!
//! Each iteration optionally waits on the shared request bucket, issues a
//! GET, then pulls the body in pieces of at most `chunk_size` bytes. Before
//! a piece is consumed the worker pays for it in its own byte bucket, so
//! its long-run byte rate converges to the configured cap.

use crate::counters::TransferCounters;
use crate::token_bucket::RateBucket;
use crate::transport::Transport;
use crate::{Error, Result};
use bytes::Bytes;
use futures_util::StreamExt;
use log::{debug, info};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Read-only parameters shared by every worker in a run.
#[derive(Debug)]
pub struct WorkerConfig {
    /// URL fetched on every iteration
    pub url: String,
    /// Maximum bytes consumed per read
    pub chunk_size: u64,
    /// Per-worker byte rate in bytes per second, 0 for unlimited
    pub byte_rate: f64,
    /// Bucket gating new requests across all workers
    pub request_bucket: Option<Arc<RateBucket>>,
}

/// Where a worker currently is in its fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    RequestPending,
    Streaming,
    Failed,
}

/// A single download loop with its own transport and byte bucket.
pub struct DownloadWorker<T> {
    id: usize,
    config: Arc<WorkerConfig>,
    transport: T,
    counters: Arc<TransferCounters>,
    byte_bucket: Option<RateBucket>,
    state: WorkerState,
}

impl<T: Transport> DownloadWorker<T> {
    /// Creates a worker.
    ///
    /// The byte bucket holds one chunk and starts drained, so the first
    /// interval does not report an initial burst.
    pub fn new(
        id: usize,
        config: Arc<WorkerConfig>,
        transport: T,
        counters: Arc<TransferCounters>,
    ) -> Result<Self> {
        let byte_bucket = if config.byte_rate > 0.0 {
            let bucket = RateBucket::new(config.chunk_size, config.byte_rate)?;
            bucket.take_available(config.chunk_size);
            Some(bucket)
        } else {
            None
        };

        Ok(Self {
            id,
            config,
            transport,
            counters,
            byte_bucket,
            state: WorkerState::Idle,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Fetches repeatedly until cancelled or a transport error occurs.
    ///
    /// Returns `Ok(())` on cancellation. Any other error is returned as-is.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        debug!("Worker {} started, chunk size {}", self.id, self.config.chunk_size);

        loop {
            if cancel.is_cancelled() {
                info!("Worker {} cancelled", self.id);
                return Ok(());
            }

            match self.fetch_once(&cancel).await {
                Ok(bytes) => debug!("Worker {} finished request, {} bytes", self.id, bytes),
                Err(Error::Cancelled) => {
                    info!("Worker {} cancelled", self.id);
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Performs one request and drains its body.
    ///
    /// Returns the number of body bytes read. A transport error leaves the
    /// worker in [`WorkerState::Failed`]; cancellation leaves it idle.
    pub async fn fetch_once(&mut self, cancel: &CancellationToken) -> Result<u64> {
        let result = self.fetch_body(cancel).await;
        self.state = match &result {
            Err(e) if !e.is_cancelled() => WorkerState::Failed,
            _ => WorkerState::Idle,
        };
        result
    }

    async fn fetch_body(&mut self, cancel: &CancellationToken) -> Result<u64> {
        self.state = WorkerState::RequestPending;
        if let Some(bucket) = &self.config.request_bucket {
            bucket.wait(1, cancel).await?;
        }

        self.counters.add_request();
        let mut body = tokio::select! {
            result = self.transport.get(&self.config.url) => result?,
            _ = cancel.cancelled() => return Err(Error::Cancelled),
        };

        self.state = WorkerState::Streaming;
        let chunk_size = self.config.chunk_size.max(1) as usize;
        let mut pending = Bytes::new();
        let mut total = 0u64;

        loop {
            if pending.is_empty() {
                let frame = tokio::select! {
                    frame = body.next() => frame,
                    _ = cancel.cancelled() => return Err(Error::Cancelled),
                };
                match frame {
                    Some(Ok(bytes)) => {
                        pending = bytes;
                        continue;
                    }
                    Some(Err(e)) => return Err(e),
                    None => break,
                }
            }

            let piece = pending.split_to(chunk_size.min(pending.len()));
            let len = piece.len() as u64;
            if let Some(bucket) = &self.byte_bucket {
                bucket.wait(len, cancel).await?;
            }
            self.counters.add_bytes(len);
            total += len;
        }

        Ok(total)
    }
}
