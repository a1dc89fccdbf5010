use clap::Parser;
use http_download_speed::{Config, FailurePolicy, SpeedTest};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "http-download-speed")]
#[command(about = "Measure sustained HTTP download throughput with rate-limited parallel clients", long_about = None)]
#[command(version)]
struct Cli {
    /// HTTP URL to download
    #[arg(short, long)]
    url: String,

    /// Max download bitrate in kbit/s for a single client (0 = unlimited)
    #[arg(short, long, default_value = "100")]
    bitrate: f64,

    /// Number of parallel download clients
    #[arg(short, long, default_value = "1")]
    clients: usize,

    /// Max requests per second across all clients (0 = unlimited)
    #[arg(short, long, default_value = "0")]
    request_rate: f64,

    /// Report interval in seconds
    #[arg(short, long, default_value = "1")]
    interval: f64,

    /// Number of download chunks per report interval
    #[arg(long, default_value = "4")]
    chunks_per_interval: u32,

    /// Exit after this many reports (0 = run until interrupted)
    #[arg(short = 'n', long, default_value = "0")]
    count: u64,

    /// Output one JSON object per report
    #[arg(short = 'J', long)]
    json: bool,

    /// Restart failed clients with exponential backoff instead of exiting
    #[arg(long)]
    restart: bool,

    /// Restarts allowed per client when --restart is set
    #[arg(long, default_value = "5")]
    max_restarts: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if !cli.bitrate.is_finite() || cli.bitrate < 0.0 {
        anyhow::bail!("bitrate must be zero or positive, got {}", cli.bitrate);
    }
    if !cli.interval.is_finite() || cli.interval <= 0.0 {
        anyhow::bail!("interval must be positive, got {}", cli.interval);
    }

    let failure_policy = if cli.restart {
        FailurePolicy::restart(cli.max_restarts)
    } else {
        FailurePolicy::Abort
    };

    let config = Config::new(cli.url)
        .with_workers(cli.clients)
        .with_bitrate((cli.bitrate * 1_000.0) as u64) // kbit/s to bit/s
        .with_request_rate(cli.request_rate)
        .with_interval(Duration::from_secs_f64(cli.interval))
        .with_chunks_per_interval(cli.chunks_per_interval)
        .with_max_ticks((cli.count > 0).then_some(cli.count))
        .with_json(cli.json)
        .with_failure_policy(failure_policy);

    let test = SpeedTest::new(config)?;

    let cancel_token = test.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_token.cancel();
        }
    });

    test.run().await?;

    Ok(())
}
