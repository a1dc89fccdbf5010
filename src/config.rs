use crate::chunk::{chunk_size, ChunkPlan};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the supervisor does when a worker fails.
///
/// # Examples
///
/// ```
/// use http_download_speed::{Config, FailurePolicy};
/// use std::time::Duration;
///
/// let config = Config::new("http://127.0.0.1:8080/blob")
///     .with_failure_policy(FailurePolicy::restart(3));
///
/// assert!(matches!(config.failure_policy, FailurePolicy::Restart { max_restarts: 3, .. }));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Stop every worker and return the first error.
    #[default]
    Abort,
    /// Respawn the failed worker after an exponential backoff, giving up
    /// once it has been restarted `max_restarts` times.
    Restart {
        max_restarts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
    },
}

impl FailurePolicy {
    /// Restart policy with 100ms initial backoff doubling up to 10s.
    pub fn restart(max_restarts: u32) -> Self {
        FailurePolicy::Restart {
            max_restarts,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
        }
    }

    /// Delay before restart number `attempt` (zero-based), or `None` when
    /// the worker should not be restarted.
    ///
    /// ```text
    /// backoff = min(initial_backoff * 2^attempt, max_backoff)
    /// ```
    pub fn backoff(&self, attempt: u32) -> Option<Duration> {
        match *self {
            FailurePolicy::Abort => None,
            FailurePolicy::Restart {
                max_restarts,
                initial_backoff,
                max_backoff,
            } => {
                if attempt >= max_restarts {
                    return None;
                }
                let factor = 2u32.saturating_pow(attempt);
                Some(initial_backoff.saturating_mul(factor).min(max_backoff))
            }
        }
    }
}

/// Configuration for an HTTP download speed run.
///
/// Use the builder methods to customize it, then hand it to
/// [`SpeedTest::new`](crate::SpeedTest::new).
///
/// # Examples
///
/// ```
/// use http_download_speed::Config;
/// use std::time::Duration;
///
/// let config = Config::new("http://192.168.1.100/large.bin")
///     .with_workers(4)
///     .with_bitrate(100_000) // 100 kbit/s per worker
///     .with_request_rate(5.0)
///     .with_interval(Duration::from_secs(1))
///     .with_max_ticks(Some(10));
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.byte_rate(), 12_500.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// URL fetched by every worker
    pub url: String,

    /// Number of parallel download workers
    pub workers: usize,

    /// Per-worker bitrate cap in bits per second, 0 for unlimited
    pub bitrate: u64,

    /// Cap on requests per second across all workers, 0 for unlimited
    pub request_rate: f64,

    /// Interval between throughput reports
    pub interval: Duration,

    /// Minimum number of body chunks read per report interval
    pub chunks_per_interval: u32,

    /// Stop after this many reports; run until cancelled if `None`
    pub max_ticks: Option<u64>,

    /// Print one JSON object per report instead of the text table
    pub json: bool,

    /// Reaction to a failed worker
    pub failure_policy: FailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: String::new(),
            workers: 1,
            bitrate: 100_000,
            request_rate: 0.0,
            interval: Duration::from_secs(1),
            chunks_per_interval: 4,
            max_ticks: None,
            json: false,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl Config {
    /// Creates a configuration for `url` with default values.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the number of parallel workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the per-worker bitrate cap in bits per second (0 = unlimited).
    pub fn with_bitrate(mut self, bits_per_sec: u64) -> Self {
        self.bitrate = bits_per_sec;
        self
    }

    /// Sets the global request-rate cap in requests per second
    /// (0 = unlimited).
    pub fn with_request_rate(mut self, requests_per_sec: f64) -> Self {
        self.request_rate = requests_per_sec;
        self
    }

    /// Sets the report interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the minimum number of chunks read per report interval.
    pub fn with_chunks_per_interval(mut self, chunks: u32) -> Self {
        self.chunks_per_interval = chunks;
        self
    }

    /// Limits the run to `ticks` reports.
    pub fn with_max_ticks(mut self, ticks: Option<u64>) -> Self {
        self.max_ticks = ticks;
        self
    }

    /// Enables or disables JSON output.
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Sets how worker failures are handled.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Per-worker byte rate in bytes per second, 0 for unlimited.
    pub fn byte_rate(&self) -> f64 {
        self.bitrate as f64 / 8.0
    }

    /// Read chunk size derived from the byte rate and interval.
    pub fn chunk_plan(&self) -> ChunkPlan {
        chunk_size(self.byte_rate(), self.interval, self.chunks_per_interval)
    }

    /// Checks the configuration before any worker is started.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::Config("No HTTP URL specified".to_string()));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "URL must use http or https: {}",
                self.url
            )));
        }
        if self.workers == 0 {
            return Err(Error::Config("at least one worker is required".to_string()));
        }
        if self.interval.is_zero() {
            return Err(Error::Config("report interval must be positive".to_string()));
        }
        if !self.request_rate.is_finite() || self.request_rate < 0.0 {
            return Err(Error::Config(format!(
                "request rate must be zero or positive, got {}",
                self.request_rate
            )));
        }
        if self.request_rate > 0.0
            && Duration::try_from_secs_f64(1.0 / self.request_rate).is_err()
        {
            return Err(Error::Config(format!(
                "request rate {} is too small to schedule",
                self.request_rate
            )));
        }
        if self.chunks_per_interval == 0 {
            return Err(Error::Config(
                "chunks per interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
