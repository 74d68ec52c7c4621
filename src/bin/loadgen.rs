use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use latency_lens::{run_load_test, HttpTarget};

/// Fire a fixed volume of GET requests at one URL with a hard cap on
/// simultaneous requests, then print the outcome counts and throughput.
#[derive(Debug, Parser)]
#[command(name = "loadgen")]
struct Args {
    /// Target URL, e.g. http://localhost:8080/test
    url: String,

    /// Total number of requests to send
    #[arg(long, default_value_t = 1000)]
    jobs: u64,

    /// Maximum number of requests simultaneously in flight
    #[arg(long, default_value_t = 60)]
    concurrency: usize,

    /// Per-request timeout in seconds; a timed-out request counts as failed
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,

    /// Print the summary as JSON instead of the plain-text table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let target = Arc::new(HttpTarget::new(&args.url)?);

    info!(
        url = %args.url,
        jobs = args.jobs,
        concurrency = args.concurrency,
        "starting load run"
    );

    let summary = run_load_test(
        target,
        args.jobs,
        args.concurrency,
        Duration::from_secs(args.timeout_secs),
    )
    .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("--- run complete ---");
    println!("submitted:     {}", summary.submitted);
    println!("succeeded:     {}", summary.succeeded);
    println!("failed:        {}", summary.failed);
    println!("wall clock:    {:.2?}", summary.wall_clock);
    println!("peak in-flight:{:>6}", summary.peak_in_flight);
    println!("throughput:    {:.2} req/s", summary.throughput);
    println!("mean latency:  {:.2?}", summary.mean_latency);

    Ok(())
}
