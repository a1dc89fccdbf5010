//! Lock-free transfer counters shared by every worker and the reporter.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic byte and request totals for one run.
///
/// Workers hold an `Arc<TransferCounters>` and only ever add to it; the
/// reporter only reads. Each counter is updated with a single atomic add,
/// so concurrent increments are never lost.
#[derive(Debug, Default)]
pub struct TransferCounters {
    bytes: AtomicU64,
    requests: AtomicU64,
}

/// Point-in-time copy of both counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub bytes: u64,
    pub requests: u64,
}

impl TransferCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds bytes read from a response body.
    pub fn add_bytes(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records one issued request.
    pub fn add_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Reads both counters.
    ///
    /// The two loads are independent, so a snapshot taken while workers are
    /// running may pair a byte total with a request total from a slightly
    /// different instant. Rates derived from it are samples anyway.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            bytes: self.bytes(),
            requests: self.requests(),
        }
    }
}

impl CounterSnapshot {
    /// Counter growth since `earlier`. Saturates rather than wrapping.
    pub fn delta_since(&self, earlier: &CounterSnapshot) -> CounterSnapshot {
        CounterSnapshot {
            bytes: self.bytes.saturating_sub(earlier.bytes),
            requests: self.requests.saturating_sub(earlier.requests),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_start_at_zero() {
        let counters = TransferCounters::new();
        assert_eq!(counters.snapshot(), CounterSnapshot::default());
    }

    #[test]
    fn test_add_bytes_and_requests() {
        let counters = TransferCounters::new();
        counters.add_bytes(1500);
        counters.add_bytes(500);
        counters.add_request();

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.bytes, 2000);
        assert_eq!(snapshot.requests, 1);
    }

    #[test]
    fn test_delta_since() {
        let earlier = CounterSnapshot {
            bytes: 1_000,
            requests: 3,
        };
        let later = CounterSnapshot {
            bytes: 1_001_000,
            requests: 13,
        };

        let delta = later.delta_since(&earlier);
        assert_eq!(delta.bytes, 1_000_000);
        assert_eq!(delta.requests, 10);
        assert_eq!(earlier.delta_since(&later), CounterSnapshot::default());
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        const THREADS: u64 = 16;
        const PER_THREAD: u64 = 1_000;

        let counters = Arc::new(TransferCounters::new());
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let counters = counters.clone();
                std::thread::spawn(move || {
                    for _ in 0..PER_THREAD {
                        counters.add_bytes(1);
                        counters.add_request();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counters.bytes(), THREADS * PER_THREAD);
        assert_eq!(counters.requests(), THREADS * PER_THREAD);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ten_thousand_tasks_increment_once() {
        let counters = Arc::new(TransferCounters::new());

        let handles: Vec<_> = (0..10_000)
            .map(|_| {
                let counters = counters.clone();
                tokio::spawn(async move { counters.add_request() })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(counters.requests(), 10_000);
    }
}
