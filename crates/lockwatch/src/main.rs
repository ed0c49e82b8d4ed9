//! lockwatch - InnoDB lock-wait monitor
//!
//! Polls a MySQL server's active transactions and appends a diagnostic
//! report to the alert log the first time a transaction has been waiting
//! on a lock for at least the given number of seconds.

#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use lockwatch_core::config::{ConnectionConfig, MonitorConfig};
use lockwatch_core::error::format_error_with_remediation;
use lockwatch_core::logging::{LogConfig, init_logging};
use lockwatch_core::monitor::Monitor;
use lockwatch_core::mysql::MysqlSource;
use lockwatch_core::sink::FileSink;

/// Alert on InnoDB transactions stuck in lock wait
#[derive(Parser, Debug)]
#[command(name = "lockwatch", version, about, long_about = None)]
struct Cli {
    /// MySQL server address (`host` or `host:port`)
    host: String,

    /// Account used for monitoring (needs the PROCESS privilege)
    user: String,

    /// Password for the monitoring account
    password: String,

    /// File that alert reports are appended to
    log_file: PathBuf,

    /// Seconds a transaction may wait on a lock before it is reported
    threshold: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // No logging flags: diagnostics are tuned through RUST_LOG only.
    if let Err(e) = init_logging(&LogConfig::default()) {
        eprintln!("Warning: could not initialize logging: {e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<lockwatch_core::Error>() {
                Some(core) => eprintln!("{}", format_error_with_remediation(core)),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let connection = ConnectionConfig::from_address(&cli.host, &cli.user, &cli.password)
        .map_err(lockwatch_core::Error::from)?;
    connection
        .validate()
        .map_err(lockwatch_core::Error::from)?;

    let config = MonitorConfig::new(&cli.log_file, Duration::from_secs(cli.threshold));
    config.validate().map_err(lockwatch_core::Error::from)?;

    let source = MysqlSource::connect(connection).await?;
    let sink = FileSink::new(&cli.log_file);
    let mut monitor = Monitor::new(source, sink, config);

    let finished = tokio::select! {
        result = monitor.run() => Some(result),
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            None
        }
    };

    match finished {
        Some(result) => result?,
        None => tracing::info!(
            cycles = monitor.cycles(),
            alerts = monitor.alerts_sent(),
            "Interrupted; shutting down"
        ),
    }
    Ok(())
}
