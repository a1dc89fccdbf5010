//! Read-buffer sizing.
//!
//! A worker pulls the response body in chunks and pays the byte bucket
//! once per chunk. Chunks have to be small enough that the bucket refills
//! several times per report interval, otherwise the reported throughput
//! jumps between zero and bursts; they also have to be large enough that
//! per-chunk overhead stays negligible.

use log::warn;
use std::fmt;
use std::time::Duration;

/// Smallest chunk a worker will read. Anything lower usually means the
/// bitrate was given in the wrong unit.
pub const MIN_CHUNK_SIZE: u64 = 10;

/// Largest chunk a worker will read, also used when the byte rate is
/// unlimited.
pub const MAX_CHUNK_SIZE: u64 = 8192;

/// Correction applied to the raw chunk size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkAdjustment {
    /// The raw size was below [`MIN_CHUNK_SIZE`]; likely a misconfiguration.
    RaisedToFloor { raw: u64 },
    /// The raw size exceeded [`MAX_CHUNK_SIZE`].
    ClampedToCeiling { raw: u64 },
}

/// Chunk size chosen for a run and how it was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub size: u64,
    pub adjustment: Option<ChunkAdjustment>,
}

impl ChunkPlan {
    /// True when the size was forced up to the floor, which deserves a
    /// warning to the user.
    pub fn is_suspicious(&self) -> bool {
        matches!(self.adjustment, Some(ChunkAdjustment::RaisedToFloor { .. }))
    }
}

impl fmt::Display for ChunkAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkAdjustment::RaisedToFloor { raw } => write!(
                f,
                "Number of bytes per interval is too low ({} per chunk), bitrate may be wrong; using {} byte chunks",
                raw, MIN_CHUNK_SIZE
            ),
            ChunkAdjustment::ClampedToCeiling { raw } => write!(
                f,
                "chunk size {} exceeds maximum, using {} byte chunks",
                raw, MAX_CHUNK_SIZE
            ),
        }
    }
}

/// Derives the read-chunk size.
///
/// `floor(byte_rate * interval / min_chunks)`, clamped to
/// `[MIN_CHUNK_SIZE, MAX_CHUNK_SIZE]`. A `byte_rate` of zero means the
/// worker is unlimited and reads [`MAX_CHUNK_SIZE`] chunks. A
/// `min_chunks` of zero is treated as one.
///
/// # Examples
///
/// ```
/// use http_download_speed::chunk::{chunk_size, MAX_CHUNK_SIZE};
/// use std::time::Duration;
///
/// // 100 kbit/s = 12,500 bytes/s, 4 chunks per second
/// let plan = chunk_size(12_500.0, Duration::from_secs(1), 4);
/// assert_eq!(plan.size, 3125);
///
/// let unlimited = chunk_size(0.0, Duration::from_secs(1), 4);
/// assert_eq!(unlimited.size, MAX_CHUNK_SIZE);
/// ```
pub fn chunk_size(byte_rate: f64, interval: Duration, min_chunks: u32) -> ChunkPlan {
    if byte_rate <= 0.0 || !byte_rate.is_finite() {
        return ChunkPlan {
            size: MAX_CHUNK_SIZE,
            adjustment: None,
        };
    }

    let raw = (byte_rate * interval.as_secs_f64() / min_chunks.max(1) as f64).floor() as u64;

    // exactly MIN_CHUNK_SIZE is a usable size and is not reported
    let plan = if raw < MIN_CHUNK_SIZE {
        ChunkPlan {
            size: MIN_CHUNK_SIZE,
            adjustment: Some(ChunkAdjustment::RaisedToFloor { raw }),
        }
    } else if raw > MAX_CHUNK_SIZE {
        ChunkPlan {
            size: MAX_CHUNK_SIZE,
            adjustment: Some(ChunkAdjustment::ClampedToCeiling { raw }),
        }
    } else {
        ChunkPlan {
            size: raw,
            adjustment: None,
        }
    };

    if let Some(adjustment @ ChunkAdjustment::RaisedToFloor { .. }) = plan.adjustment {
        warn!("{}", adjustment);
    }

    plan
}
