use http_download_speed::{Config, FailurePolicy, ProgressCallback, ProgressEvent, SpeedTest};
use std::time::Duration;

/// Custom callback that logs progress events
struct MyProgressCallback;

impl ProgressCallback for MyProgressCallback {
    fn on_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::TestStarted {
                workers,
                chunk_size,
            } => {
                println!("Started {} workers, {} byte chunks", workers, chunk_size);
            }
            ProgressEvent::Tick { index, rates } => {
                println!(
                    "#{:<3} {} bytes in {:.2}s @ {:.2} Mbps, {:.1} req/s",
                    index,
                    rates.bytes,
                    rates.elapsed.as_secs_f64(),
                    rates.bits_per_second / 1_000_000.0,
                    rates.requests_per_second
                );
            }
            ProgressEvent::WorkerFailed { worker_id, error } => {
                eprintln!("Worker {} failed: {}", worker_id, error);
            }
            ProgressEvent::WorkerRestarted {
                worker_id,
                attempt,
                backoff,
            } => {
                println!(
                    "Restarting worker {} in {:?} (attempt {})",
                    worker_id, backoff, attempt
                );
            }
            ProgressEvent::TestCompleted(summary) => {
                println!(
                    "Done: {} bytes, {} requests in {:.2}s @ {:.2} Mbps",
                    summary.total_bytes,
                    summary.total_requests,
                    summary.elapsed.as_secs_f64(),
                    summary.bits_per_second() / 1_000_000.0
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://127.0.0.1:8080/large.bin".to_string());

    let config = Config::new(url)
        .with_workers(4)
        .with_bitrate(2_000_000)
        .with_request_rate(20.0)
        .with_interval(Duration::from_secs(2))
        .with_max_ticks(Some(5))
        .with_json(true)
        .with_failure_policy(FailurePolicy::restart(3));

    SpeedTest::new(config)?
        .with_callback(MyProgressCallback)
        .run()
        .await?;

    Ok(())
}
