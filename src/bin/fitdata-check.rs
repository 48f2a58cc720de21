//! # Data Layer Connectivity Check
//!
//! Loads the data layer configuration, builds the connection pool and the
//! cache, runs the monitor health check and prints a performance report.
//! Exits non-zero when the layer is unhealthy.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use fitness_data::config::ConfigLoader;
use fitness_data::database::{PgConnectionFactory, Query};
use fitness_data::logging::init_structured_logging;
use fitness_data::monitoring::DatabaseMonitor;
use fitness_data::services::DataAccessService;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "fitdata-check")]
#[command(about = "Check database and cache connectivity for the fitness data layer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Environment preset (development, test, production)
    #[arg(short, long)]
    environment: Option<String>,

    /// TOML configuration file layered over the preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of probe queries to run through the monitor
    #[arg(long, default_value_t = 3)]
    probes: u32,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use environment-driven structured logging (console plus JSON file under log/)
    #[arg(long)]
    structured_logs: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.structured_logs {
        init_structured_logging();
    } else {
        let level = match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(false)
            .finish();
        // A subscriber may already be installed by the embedding environment
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    match run(&cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("❌ {e:#}");
            process::exit(2);
        }
    }
}

async fn run(cli: &Cli) -> Result<bool> {
    let mut loader = ConfigLoader::new();
    if let Some(environment) = &cli.environment {
        loader = loader.with_environment(environment);
    }
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let config = loader.load().context("loading configuration")?;

    let data = DataAccessService::from_config(&config, Arc::new(PgConnectionFactory::new()))
        .await
        .context("building the connection pool")?;
    let monitor = DatabaseMonitor::for_service(&data);

    for probe in 0..cli.probes {
        let probe_query = Query::probe();
        let result = monitor
            .track_query("probe", || data.pool().execute_query(&probe_query))
            .await;
        if let Err(e) = result {
            warn!(probe = probe, error = %e, "Probe query failed");
        }
    }

    let report = monitor.report().await;
    match cli.format {
        OutputFormat::Text => println!("{report}"),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serializing report")?
        ),
    }

    info!(healthy = report.health.overall, "Connectivity check finished");
    data.pool().close();
    data.cache().close().await;
    Ok(report.health.overall)
}
