//! Token bucket rate limiter shared between download workers.
//!
//! The same type gates two different quantities: bytes pulled from a
//! response body (one bucket per worker) and requests issued (one bucket
//! shared by every worker).
//!
//! ## Algorithm
//!
//! The bucket holds up to `capacity` tokens and refills continuously at
//! `rate` tokens per second. A caller of [`RateBucket::wait`] reserves its
//! tokens immediately, driving the level below zero if necessary, and then
//! sleeps exactly as long as the refill needs to pay the deficit back.
//! Reservations are therefore served in the order they were made, and the
//! number of tokens granted over any window `T` never exceeds
//! `capacity + rate * T`.
//!
//! A rate of zero means "unlimited". Such a bucket cannot be constructed:
//! callers skip the limiter entirely instead.

use crate::{Error, Result};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// Token bucket rate limiter safe for concurrent waiters.
///
/// # Examples
///
/// ```
/// use http_download_speed::token_bucket::RateBucket;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> http_download_speed::Result<()> {
/// // 12,500 bytes/sec with a burst of one 1,000 byte chunk
/// let bucket = RateBucket::new(1_000, 12_500.0)?;
/// let cancel = CancellationToken::new();
///
/// bucket.wait(1_000, &cancel).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RateBucket {
    capacity: f64,
    rate: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    /// Negative while reservations are outstanding.
    tokens: f64,
    last_refill: Instant,
}

impl RateBucket {
    /// Creates a full bucket.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of tokens the bucket can hold
    /// * `rate_per_sec` - Refill rate in tokens per second, must be positive
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the rate is zero, negative or not finite.
    pub fn new(capacity: u64, rate_per_sec: f64) -> Result<Self> {
        if !rate_per_sec.is_finite() || rate_per_sec <= 0.0 {
            return Err(Error::Config(format!(
                "token bucket rate must be positive, got {}",
                rate_per_sec
            )));
        }

        let capacity = capacity as f64;
        Ok(Self {
            capacity,
            rate: rate_per_sec,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        })
    }

    /// Maximum number of tokens the bucket holds.
    pub fn capacity(&self) -> u64 {
        self.capacity as u64
    }

    /// Refill rate in tokens per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Number of whole tokens that could be taken right now without waiting.
    pub fn available(&self) -> u64 {
        let mut state = self.state.lock();
        self.refill(&mut state, Instant::now());
        state.tokens.max(0.0).floor() as u64
    }

    /// Removes up to `n` tokens that are available immediately.
    ///
    /// Never waits. Returns the number of tokens actually removed, which is
    /// zero while other callers hold outstanding reservations.
    pub fn take_available(&self, n: u64) -> u64 {
        let mut state = self.state.lock();
        self.refill(&mut state, Instant::now());

        if state.tokens <= 0.0 {
            return 0;
        }

        let taken = (state.tokens.floor() as u64).min(n);
        state.tokens -= taken as f64;
        taken
    }

    /// Takes `n` tokens, sleeping until the refill has produced them.
    ///
    /// The sleep is raced against `cancel`. A cancelled wait gives its
    /// reservation back and returns [`Error::Cancelled`].
    pub async fn wait(&self, n: u64, cancel: &CancellationToken) -> Result<()> {
        let delay = match self.reserve(n) {
            Some(delay) => delay,
            None => return Ok(()),
        };

        tokio::select! {
            _ = time::sleep(delay) => Ok(()),
            _ = cancel.cancelled() => {
                self.refund(n);
                Err(Error::Cancelled)
            }
        }
    }

    /// Reserves `n` tokens and returns how long the caller must sleep before
    /// using them, or `None` if they were already in the bucket.
    fn reserve(&self, n: u64) -> Option<Duration> {
        let mut state = self.state.lock();
        self.refill(&mut state, Instant::now());

        state.tokens -= n as f64;
        if state.tokens >= 0.0 {
            return None;
        }

        // a tiny rate can push the deficit past what Duration holds
        Some(Duration::try_from_secs_f64(-state.tokens / self.rate).unwrap_or(Duration::MAX))
    }

    fn refund(&self, n: u64) {
        let mut state = self.state.lock();
        state.tokens = (state.tokens + n as f64).min(self.capacity);
    }

    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill);
        if elapsed.is_zero() {
            return;
        }

        state.tokens = (state.tokens + elapsed.as_secs_f64() * self.rate).min(self.capacity);
        state.last_refill = now;
    }
}
