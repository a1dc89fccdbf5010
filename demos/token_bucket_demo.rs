/// Example demonstrating token bucket rate limiting
///
/// Several tasks share one request bucket while each paces its own byte
/// bucket, the same arrangement the download workers use.
///
/// Run this example with:
///   cargo run --example token_bucket_demo
use http_download_speed::chunk::chunk_size;
use http_download_speed::token_bucket::RateBucket;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> http_download_speed::Result<()> {
    println!("Token Bucket Rate Limiting Demo");
    println!("===============================\n");

    let tasks = 4;
    let bitrate: u64 = 800_000;
    let byte_rate = bitrate as f64 / 8.0;
    let request_rate = 10.0;
    let request_size: u64 = 20_000;
    let plan = chunk_size(byte_rate, Duration::from_secs(1), 4);

    println!("Configuration:");
    println!("  Tasks: {}", tasks);
    println!("  Per-task bitrate: {} kbit/s", bitrate / 1_000);
    println!("  Request rate (shared): {} req/s", request_rate);
    println!("  Chunk size: {} bytes\n", plan.size);

    let requests = Arc::new(RateBucket::new(1, request_rate)?);
    requests.take_available(1);
    let total_bytes = Arc::new(AtomicU64::new(0));
    let total_requests = Arc::new(AtomicU64::new(0));
    let cancel = CancellationToken::new();
    let start = Instant::now();

    let mut handles = Vec::new();
    for _ in 0..tasks {
        let requests = requests.clone();
        let total_bytes = total_bytes.clone();
        let total_requests = total_requests.clone();
        let cancel = cancel.clone();
        let bytes = RateBucket::new(plan.size, byte_rate)?;
        bytes.take_available(plan.size);

        handles.push(tokio::spawn(async move {
            loop {
                if requests.wait(1, &cancel).await.is_err() {
                    return;
                }
                total_requests.fetch_add(1, Ordering::Relaxed);

                let mut remaining = request_size;
                while remaining > 0 {
                    let piece = remaining.min(plan.size);
                    if bytes.wait(piece, &cancel).await.is_err() {
                        return;
                    }
                    total_bytes.fetch_add(piece, Ordering::Relaxed);
                    remaining -= piece;
                }
            }
        }));
    }

    for second in 1..=3 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        println!(
            "[{}s] {:8} bytes, {:3} requests",
            second,
            total_bytes.load(Ordering::Relaxed),
            total_requests.load(Ordering::Relaxed)
        );
    }

    cancel.cancel();
    for handle in handles {
        let _ = handle.await;
    }

    let elapsed = start.elapsed().as_secs_f64();
    let bits_per_second = total_bytes.load(Ordering::Relaxed) as f64 * 8.0 / elapsed;
    let requests_per_second = total_requests.load(Ordering::Relaxed) as f64 / elapsed;

    println!("\nResults:");
    println!("  Duration: {:.3} seconds", elapsed);
    println!(
        "  Aggregate bitrate: {:.1} kbit/s (cap {} kbit/s)",
        bits_per_second / 1_000.0,
        tasks as u64 * bitrate / 1_000
    );
    println!(
        "  Request rate: {:.2} req/s (cap {})",
        requests_per_second, request_rate
    );
    Ok(())
}
