use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tollgate::config::TollgateConfig;
use tollgate::simulate::{Simulation, SimulationReport};

/// Drive a token bucket with simulated concurrent load.
#[derive(Parser, Debug)]
#[command(name = "tollgate", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum tokens the bucket can hold
    #[arg(long)]
    capacity: Option<u64>,

    /// Tokens added per second
    #[arg(long)]
    fill_rate: Option<f64>,

    /// Tokens requested per call
    #[arg(long)]
    cost: Option<u64>,

    /// Number of concurrent workers
    #[arg(long)]
    workers: Option<usize>,

    /// Requests issued by each worker
    #[arg(long)]
    requests: Option<u64>,

    /// Pause between a worker's requests in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;
    info!(
        capacity = config.bucket.capacity,
        fill_rate = config.bucket.fill_rate,
        "Configuration loaded"
    );

    let bucket = Arc::new(config.bucket.build()?);
    let simulation = Simulation::new(config.simulation, bucket);

    tokio::select! {
        report = simulation.run() => {
            log_report(&report?);
        }
        _ = shutdown_signal() => {
            warn!("Simulation interrupted");
        }
    }

    Ok(())
}

fn log_report(report: &SimulationReport) {
    info!(
        admitted = report.admitted,
        rejected = report.rejected,
        remaining = report.remaining,
        elapsed = ?report.elapsed,
        "Simulation finished"
    );
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    if args.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    }
}

/// Read the configuration file, if any, then apply command-line overrides.
fn load_config(args: &Args) -> anyhow::Result<TollgateConfig> {
    let mut config = match &args.config {
        Some(path) => TollgateConfig::from_file(path)?,
        None => TollgateConfig::default(),
    };

    if let Some(capacity) = args.capacity {
        config.bucket.capacity = capacity;
    }
    if let Some(fill_rate) = args.fill_rate {
        config.bucket.fill_rate = fill_rate;
    }
    if let Some(cost) = args.cost {
        config.simulation.cost = cost;
    }
    if let Some(workers) = args.workers {
        config.simulation.workers = workers;
    }
    if let Some(requests) = args.requests {
        config.simulation.requests_per_worker = requests;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.simulation.interval_ms = interval_ms;
    }

    Ok(config)
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "tollgate",
            "--capacity",
            "20",
            "--fill-rate",
            "0.5",
            "--workers",
            "2",
            "--interval-ms",
            "0",
        ]);

        let config = load_config(&args).unwrap();

        assert_eq!(config.bucket.capacity, 20);
        assert_eq!(config.bucket.fill_rate, 0.5);
        assert_eq!(config.simulation.workers, 2);
        assert_eq!(config.simulation.interval_ms, 0);
        assert_eq!(config.simulation.cost, 1);
    }

    #[test]
    fn test_log_report_accepts_any_elapsed_time() {
        let report = SimulationReport {
            admitted: 1,
            rejected: 2,
            elapsed: std::time::Duration::MAX,
            remaining: 0.5,
        };
        log_report(&report);
    }

    #[test]
    fn test_args_verify() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
