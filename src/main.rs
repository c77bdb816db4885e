mod collectors;
mod config;
mod host;
mod ledger;
mod logfile;
mod report;
mod run;

use clap::Parser;
use collectors::system::SysinfoProvider;
use config::{Overrides, PlatformPaths, RunConfig};
use host::HostIdentity;
use ledger::{ledger_file_name, Ledger};
use std::io::{self, Write};
use std::path::PathBuf;
use sysinfo::{System, SystemExt};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "healthmon")]
#[command(version)]
#[command(about = "Samples host health metrics over a bounded window")]
struct Cli {
    /// Optional YAML overrides file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Metric collection interval in minutes; prompted for when absent.
    #[arg(long)]
    interval_minutes: Option<u64>,
    /// Total runtime in hours; prompted for when absent.
    #[arg(long)]
    runtime_hours: Option<f64>,
    /// Overrides the per-OS default log directory.
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Overrides the per-OS default path whose disk usage is sampled.
    #[arg(long)]
    data_path: Option<PathBuf>,
    /// Overrides the 30-day activity-log retention.
    #[arg(long)]
    retention_days: Option<u64>,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let mut overrides = match &cli.config {
        Some(path) => match Overrides::load_from_file(path) {
            Ok(overrides) => overrides,
            Err(err) => {
                error!(error = %err, "could not load overrides file");
                std::process::exit(1);
            }
        },
        None => Overrides::default(),
    };
    // Flags win over the overrides file.
    if cli.log_dir.is_some() {
        overrides.log_dir = cli.log_dir.clone();
    }
    if cli.data_path.is_some() {
        overrides.data_path = cli.data_path.clone();
    }
    if cli.retention_days.is_some() {
        overrides.retention_days = cli.retention_days;
    }

    let interval_minutes = match cli.interval_minutes.or(overrides.interval_minutes) {
        Some(value) => value,
        None => {
            match prompt_parsed::<u64>("Enter the metric collection interval (in minutes): ") {
                Some(value) => value,
                None => {
                    error!("interval must be a positive whole number of minutes");
                    std::process::exit(1);
                }
            }
        }
    };
    let runtime_hours = match cli.runtime_hours.or(overrides.runtime_hours) {
        Some(value) => value,
        None => match prompt_parsed::<f64>("Enter the total runtime (in hours): ") {
            Some(value) => value,
            None => {
                error!("runtime must be a positive number of hours");
                std::process::exit(1);
            }
        },
    };

    let paths = match PlatformPaths::for_current_os() {
        Ok(paths) => paths,
        Err(err) => {
            error!(error = %err, "platform path lookup failed");
            std::process::exit(1);
        }
    };
    let cfg = match RunConfig::build(paths, &overrides, interval_minutes, runtime_hours) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "invalid run configuration");
            std::process::exit(1);
        }
    };
    if let Err(err) = config::ensure_log_dir(&cfg.log_dir) {
        error!(error = %err, "log directory check failed");
        std::process::exit(1);
    }

    let identity = HostIdentity::resolve(&System::new());
    let ledger = Ledger::new(cfg.log_dir.join(ledger_file_name(&identity.hostname)));

    info!(
        hostname = %identity.hostname,
        interval = %humantime::format_duration(cfg.interval),
        runtime = %humantime::format_duration(cfg.total_runtime),
        log_dir = %cfg.log_dir.display(),
        data_path = %cfg.data_path.display(),
        "starting sampling run"
    );

    let mut provider = SysinfoProvider::new();
    let outcome = match run::run_sampler(&cfg, &identity, &mut provider, &ledger).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(error = %err, "sampling run aborted");
            std::process::exit(1);
        }
    };

    println!("\nThe sampling run has completed\n");
    match ledger.rows_since(outcome.start_row_count) {
        Ok(rows) => {
            println!(" *** Metrics collected *** ");
            print!("{}", report::render_table(&rows));
            info!(
                ticks = outcome.ticks,
                rows_added = rows.len(),
                ledger = %ledger.path().display(),
                "run complete"
            );
        }
        Err(err) => {
            error!(error = %err, path = %ledger.path().display(), "could not read ledger for the summary");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Interactive fallback for a missing run parameter, mirroring the original
/// operator flow. `None` means unparseable input, which is fatal upstream.
fn prompt_parsed<T: std::str::FromStr>(label: &str) -> Option<T> {
    print!("{label}");
    io::stdout().flush().ok()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line).ok()?;
    line.trim().parse().ok()
}
