//! tallyd: the Tally statsd export daemon.
//!
//! Reads the stats dump a server writes to disk and pushes the per-interval
//! differences to a statsd collector.
//!
//! # Usage
//!
//! ```text
//! tallyd run --config tally.toml
//! tallyd run --config tally.toml --address 10.0.0.5:8125 --protocol tcp --interval 10s
//! tallyd check --config tally.toml
//! ```

mod source;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tally_core::{Protocol, SourceConfig, TallyConfig};
use tally_exporter::StatsdExporter;
use tally_statsd::StatsdClient;
use tokio::sync::watch;
use tracing::info;

use crate::source::FileStatsSource;

#[derive(Parser)]
#[command(name = "tallyd", about = "Tally statsd exporter daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export stats until interrupted.
    Run(ConfigArgs),
    /// Validate the configuration and print it with defaults filled in.
    Check(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// Path to tally.toml.
    #[arg(long, default_value = "tally.toml")]
    config: PathBuf,

    /// Override `statsd.address`.
    #[arg(long)]
    address: Option<String>,

    /// Override `statsd.prefix`.
    #[arg(long)]
    prefix: Option<String>,

    /// Override `statsd.protocol`, "udp" or "tcp".
    #[arg(long)]
    protocol: Option<Protocol>,

    /// Override `statsd.interval`, e.g. "10s".
    #[arg(long)]
    interval: Option<String>,

    /// Override `source.path`.
    #[arg(long)]
    stats_file: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> anyhow::Result<TallyConfig> {
        let mut config = TallyConfig::from_file(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;

        if let Some(address) = &self.address {
            config.statsd.address = address.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.statsd.prefix = prefix.clone();
        }
        if let Some(protocol) = self.protocol {
            config.statsd.protocol = protocol;
        }
        if let Some(interval) = &self.interval {
            config.statsd.interval = interval.clone();
        }
        if let Some(path) = &self.stats_file {
            match &mut config.source {
                Some(source) => source.path = path.clone(),
                None => {
                    config.source = Some(SourceConfig {
                        path: path.clone(),
                        include_clients: false,
                    })
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tally=debug"));
    let logs = tracing_subscriber::fmt().with_env_filter(filter);
    if cli.log_json {
        logs.json().init();
    } else {
        logs.init();
    }

    match cli.command {
        Command::Run(args) => run(args.load()?).await,
        Command::Check(args) => {
            let config = args.load()?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

async fn run(config: TallyConfig) -> anyhow::Result<()> {
    let source_config = config
        .source
        .as_ref()
        .context("no stats source configured, set [source] path or --stats-file")?;

    let client = StatsdClient::from_config(&config.statsd)?;
    let source = Arc::new(FileStatsSource::new(&source_config.path));
    info!(
        address = %config.statsd.address,
        protocol = %config.statsd.protocol,
        path = %source.path().display(),
        "tallyd starting"
    );

    let mut exporter = StatsdExporter::from_config(&config.statsd, client, source.clone())?
        .include_clients(source_config.include_clients);
    if config.statsd.mem_stats {
        exporter = exporter.with_memory_source(source);
    }

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let exporter_handle = tokio::spawn(exporter.run(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("failed to install Ctrl-C handler")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    exporter_handle.await?;

    info!("tallyd stopped");
    Ok(())
}
