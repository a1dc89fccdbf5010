//! Interval reporting on a fixed wall-clock schedule.
//!
//! The reporter is not driven by the workers. It wakes every interval,
//! snapshots the shared counters, and turns the growth since the previous
//! snapshot into interval-local bit/s and requests/s. Only the previous
//! sample is kept.

use crate::counters::{CounterSnapshot, TransferCounters};
use crate::format::si_format;
use crate::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Header printed above the text report.
pub const HEADER: &str = "Time    \tDownload speed (bit/s)\tRequests per second";

/// Counter values captured at one instant.
#[derive(Debug, Clone, Copy)]
pub struct ReportSample {
    pub taken_at: Instant,
    pub counters: CounterSnapshot,
}

impl ReportSample {
    pub fn capture(counters: &TransferCounters) -> Self {
        Self {
            taken_at: Instant::now(),
            counters: counters.snapshot(),
        }
    }
}

/// Throughput over one report interval.
///
/// # Examples
///
/// ```
/// use http_download_speed::counters::CounterSnapshot;
/// use http_download_speed::interval_reporter::IntervalRates;
/// use std::time::Duration;
///
/// let delta = CounterSnapshot { bytes: 1_000_000, requests: 10 };
/// let rates = IntervalRates::from_delta(delta, Duration::from_secs(1));
///
/// assert_eq!(rates.bits_per_second, 8_000_000.0);
/// assert_eq!(rates.requests_per_second, 10.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntervalRates {
    pub elapsed: Duration,
    pub bytes: u64,
    pub requests: u64,
    pub bits_per_second: f64,
    pub requests_per_second: f64,
}

impl IntervalRates {
    /// Rates between two samples.
    pub fn between(previous: &ReportSample, current: &ReportSample) -> Self {
        Self::from_delta(
            current.counters.delta_since(&previous.counters),
            current.taken_at.saturating_duration_since(previous.taken_at),
        )
    }

    /// Rates for `delta` accumulated over `elapsed`. A zero-length interval
    /// yields zero rates.
    pub fn from_delta(delta: CounterSnapshot, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let (bits_per_second, requests_per_second) = if secs > 0.0 {
            (
                delta.bytes as f64 * 8.0 / secs,
                delta.requests as f64 / secs,
            )
        } else {
            (0.0, 0.0)
        };

        Self {
            elapsed,
            bytes: delta.bytes,
            requests: delta.requests,
            bits_per_second,
            requests_per_second,
        }
    }
}

/// One report.
#[derive(Debug, Clone)]
pub struct Tick {
    /// 1-based report number
    pub index: u64,
    /// Wall-clock time the counters were sampled
    pub time: DateTime<Local>,
    pub rates: IntervalRates,
}

impl Tick {
    /// Text table row: `HH:MM:SS\t<bit/s>\t<req/s>`.
    pub fn to_line(&self) -> String {
        format_line(&self.time.format("%H:%M:%S").to_string(), &self.rates)
    }

    /// Single-line JSON object for machine-readable output.
    pub fn to_json(&self) -> Result<String> {
        let value = serde_json::json!({
            "tick": self.index,
            "time": self.time.to_rfc3339(),
            "interval_seconds": self.rates.elapsed.as_secs_f64(),
            "bytes": self.rates.bytes,
            "requests": self.rates.requests,
            "bits_per_second": self.rates.bits_per_second,
            "requests_per_second": self.rates.requests_per_second,
        });
        Ok(serde_json::to_string(&value)?)
    }
}

/// Formats one report row for the given clock string.
pub fn format_line(clock: &str, rates: &IntervalRates) -> String {
    format!(
        "{}\t{}\t{}",
        clock,
        si_format(rates.bits_per_second),
        si_format(rates.requests_per_second)
    )
}

/// Writes a one-off notice for the user.
///
/// Text mode puts it on `out` next to the table. JSON mode sends it to
/// `err` so `out` stays one JSON object per line.
pub fn write_notice<O: Write, E: Write>(
    notice: &str,
    json: bool,
    out: &mut O,
    err: &mut E,
) -> Result<()> {
    if json {
        writeln!(err, "{}", notice)?;
    } else {
        writeln!(out, "{}", notice)?;
    }
    Ok(())
}

/// Fixed-interval sampler over the shared counters.
pub struct Reporter {
    counters: Arc<TransferCounters>,
    timer: Interval,
    previous: ReportSample,
    ticks: u64,
    json: bool,
}

impl Reporter {
    /// Creates a reporter whose first tick fires one `period` from now.
    pub fn new(counters: Arc<TransferCounters>, period: Duration, json: bool) -> Self {
        let previous = ReportSample::capture(&counters);
        let mut timer = time::interval_at(previous.taken_at + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            counters,
            timer,
            previous,
            ticks: 0,
            json,
        }
    }

    /// Number of ticks produced so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Waits for the next timer firing and samples the counters.
    ///
    /// Cancel safe: dropping the future before the timer fires loses
    /// nothing.
    pub async fn next_tick(&mut self) -> Tick {
        self.timer.tick().await;
        self.sample()
    }

    /// Samples the counters now and advances the previous sample.
    pub fn sample(&mut self) -> Tick {
        let current = ReportSample::capture(&self.counters);
        let rates = IntervalRates::between(&self.previous, &current);
        self.previous = current;
        self.ticks += 1;

        Tick {
            index: self.ticks,
            time: Local::now(),
            rates,
        }
    }

    /// Prints the table header in text mode.
    pub fn print_header(&self) {
        if !self.json {
            println!("{}", HEADER);
        }
    }

    /// Prints a tick as a table row or JSON line.
    pub fn print(&self, tick: &Tick) -> Result<()> {
        if self.json {
            println!("{}", tick.to_json()?);
        } else {
            println!("{}", tick.to_line());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_from_synthetic_delta() {
        let delta = CounterSnapshot {
            bytes: 1_000_000,
            requests: 10,
        };
        let rates = IntervalRates::from_delta(delta, Duration::from_millis(1000));

        assert_eq!(si_format(rates.bits_per_second), "    8.000M");
        assert_eq!(si_format(rates.requests_per_second), "   10.000 ");
    }

    #[test]
    fn test_zero_interval_yields_zero_rates() {
        let delta = CounterSnapshot {
            bytes: 500,
            requests: 1,
        };
        let rates = IntervalRates::from_delta(delta, Duration::ZERO);
        assert_eq!(rates.bits_per_second, 0.0);
        assert_eq!(rates.requests_per_second, 0.0);
    }

    #[test]
    fn test_format_line() {
        let rates = IntervalRates::from_delta(
            CounterSnapshot {
                bytes: 1_000_000,
                requests: 10,
            },
            Duration::from_secs(1),
        );
        assert_eq!(
            format_line("12:34:56", &rates),
            "12:34:56\t    8.000M\t   10.000 "
        );
    }

    #[test]
    fn test_header_layout() {
        let columns: Vec<&str> = HEADER.split('\t').collect();
        assert_eq!(
            columns,
            vec!["Time    ", "Download speed (bit/s)", "Requests per second"]
        );
    }

    #[test]
    fn test_tick_to_json() {
        let tick = Tick {
            index: 3,
            time: Local::now(),
            rates: IntervalRates::from_delta(
                CounterSnapshot {
                    bytes: 125,
                    requests: 2,
                },
                Duration::from_secs(2),
            ),
        };

        let value: serde_json::Value = serde_json::from_str(&tick.to_json().unwrap()).unwrap();
        assert_eq!(value["tick"], 3);
        assert_eq!(value["bytes"], 125);
        assert_eq!(value["bits_per_second"], 500.0);
        assert_eq!(value["requests_per_second"], 1.0);
    }

    #[test]
    fn test_notice_kept_out_of_json_stream() {
        let mut out = Vec::new();
        let mut err = Vec::new();

        write_notice("bitrate may be wrong", true, &mut out, &mut err).unwrap();
        assert!(out.is_empty());
        assert_eq!(String::from_utf8(err).unwrap(), "bitrate may be wrong\n");

        let mut out = Vec::new();
        let mut err = Vec::new();
        write_notice("bitrate may be wrong", false, &mut out, &mut err).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "bitrate may be wrong\n");
        assert!(err.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_reports_interval_local_rates() {
        let counters = Arc::new(TransferCounters::new());
        let mut reporter = Reporter::new(counters.clone(), Duration::from_secs(1), false);

        counters.add_bytes(1_000_000);
        for _ in 0..10 {
            counters.add_request();
        }
        let first = reporter.next_tick().await;
        assert_eq!(first.index, 1);
        assert_eq!(first.rates.elapsed, Duration::from_secs(1));
        assert_eq!(first.rates.bits_per_second, 8_000_000.0);
        assert_eq!(first.rates.requests_per_second, 10.0);

        counters.add_bytes(250_000);
        let second = reporter.next_tick().await;
        assert_eq!(second.index, 2);
        assert_eq!(second.rates.bytes, 250_000);
        assert_eq!(second.rates.bits_per_second, 2_000_000.0);
        assert_eq!(second.rates.requests, 0);
        assert_eq!(reporter.ticks(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_fires_on_fixed_schedule() {
        let counters = Arc::new(TransferCounters::new());
        let start = Instant::now();
        let mut reporter = Reporter::new(counters, Duration::from_millis(250), true);

        for expected in 1..=4u64 {
            reporter.next_tick().await;
            assert_eq!(start.elapsed(), Duration::from_millis(250 * expected));
        }
    }
}
