//! NetDrift - Network Health Diagnostics
//!
//! Continuous ping monitoring, periodic throughput tests, offline log
//! analysis, and a live dashboard over the collected session data.

mod analysis;
mod config;
mod monitor;
mod probe;
mod report;
mod session;
mod web;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use monitor::{MonitorOptions, ThroughputOptions};
use probe::ThroughputConfig;
use web::Server;

#[derive(Parser, Debug)]
#[command(name = "netdrift")]
#[command(about = "Network health diagnostics: ping monitoring, throughput tests, and analysis")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Continuously ping targets and log disruptions until Ctrl+C
    Monitor {
        /// Comma-separated targets; detects the gateway when omitted
        #[arg(short, long, value_delimiter = ',')]
        targets: Vec<String>,

        /// Seconds between probes per target
        #[arg(long, default_value = "1.0")]
        interval_secs: f64,

        /// Per-probe reply timeout in seconds
        #[arg(long, default_value = "1.0")]
        timeout_secs: f64,

        /// Stop after this many seconds instead of waiting for Ctrl+C
        #[arg(long)]
        duration_secs: Option<u64>,

        /// Session name; the timestamped default keeps logs discoverable
        #[arg(long)]
        run_name: Option<String>,

        /// Output directory (default from NETDRIFT_DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Run periodic download/upload speed measurements
    Throughput {
        /// Seconds between measurement rounds
        #[arg(long, default_value = "300.0")]
        interval_secs: f64,

        /// Stop after this many seconds instead of waiting for Ctrl+C
        #[arg(long)]
        duration_secs: Option<u64>,

        /// Session name; the timestamped default keeps logs discoverable
        #[arg(long)]
        run_name: Option<String>,

        /// Output directory (default from NETDRIFT_DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Speeds below this many Mbps count as degraded
        #[arg(long, default_value = "10.0")]
        low_speed_mbps: f64,
    },

    /// Analyze finished session logs for hour-of-day failure patterns
    Patterns {
        /// Directory holding session logs (default from NETDRIFT_DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Prefix for the exported hourly JSON
        #[arg(long, default_value = "netdrift_patterns")]
        json_prefix: String,
    },

    /// Print the disruption analysis for one session log
    Report {
        /// Path to a session log file
        log_file: PathBuf,
    },

    /// Serve the live dashboard
    Dashboard {
        /// Port override (default from NETDRIFT_HTTP_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("netdrift=info".parse()?),
        )
        .init();

    let cfg = Config::load();
    let args = Args::parse();

    match args.command {
        Command::Monitor {
            targets,
            interval_secs,
            timeout_secs,
            duration_secs,
            run_name,
            data_dir,
        } => {
            let opts = MonitorOptions {
                targets,
                interval_secs,
                timeout_secs,
                duration_secs,
                run_name,
                data_dir: data_dir.unwrap_or(cfg.data_dir),
            };
            monitor::run_monitor(opts).await
        }
        Command::Throughput {
            interval_secs,
            duration_secs,
            run_name,
            data_dir,
            low_speed_mbps,
        } => {
            let config = ThroughputConfig {
                low_speed_threshold_mbps: low_speed_mbps,
                ..Default::default()
            };
            let opts = ThroughputOptions {
                interval_secs,
                duration_secs,
                run_name,
                data_dir: data_dir.unwrap_or(cfg.data_dir),
                config,
            };
            monitor::run_throughput(opts).await
        }
        Command::Patterns {
            data_dir,
            json_prefix,
        } => {
            report::run_patterns(&data_dir.unwrap_or(cfg.data_dir), &json_prefix)?;
            Ok(())
        }
        Command::Report { log_file } => {
            report::run_report(&log_file)?;
            Ok(())
        }
        Command::Dashboard { port } => {
            let mut cfg = cfg;
            if let Some(port) = port {
                cfg.http_port = port;
            }
            tracing::info!("Starting NetDrift dashboard on port {}...", cfg.http_port);
            let server = Server::new(cfg);
            server.start().await
        }
    }
}
