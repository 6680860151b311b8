use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tcpscan_rs::engine::{EngineConfig, ScanEngine};
use tcpscan_rs::gateway::ScanGateway;
use tcpscan_rs::server::{self, AppState};

/// tcpscan-rs — TCP port-scan service with a fixed probe worker pool and a
/// bounded admission queue, exposed over a small HTTP API.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tcpscan-rs",
    version,
    about = "TCP port-scan service: GET /scan/{ip}/{start_port}/{end_port}",
    long_about = None
)]
struct Cli {
    /// Address the HTTP API listens on.
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Number of probe workers (upper bound on concurrent sockets).
    #[arg(long, default_value_t = 10)]
    workers: usize,

    /// Maximum number of scan requests waiting for execution.
    #[arg(long = "queue-capacity", default_value_t = 10)]
    queue_capacity: usize,

    /// Per-port connect timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 1000)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let engine = Arc::new(ScanEngine::new(EngineConfig {
        workers: cli.workers,
        probe_timeout: Duration::from_millis(cli.timeout_ms),
    }));
    let gateway = ScanGateway::new(engine.clone(), cli.queue_capacity);

    server::serve(&cli.bind, AppState { gateway }).await?;

    // The listener has drained; let the workers finish their current probes.
    engine.shutdown();
    Ok(())
}
