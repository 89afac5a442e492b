//! Tunnelpick CLI
//!
//! Selects the best available VPN server from a directory of .ovpn config
//! files, by latency and/or remotely reported load, then hands off to an
//! external OpenVPN client.

mod connector;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tunnelpick_core::{config, Config, SelectionMetric, Transport};
use tunnelpick_select::{LatencyProber, LoadFetcher, PingRunner, SelectionService};

#[derive(Parser)]
#[command(name = "tunnelpick")]
#[command(about = "Select the best VPN server by latency and load, then connect")]
struct Cli {
    /// Path to a config file - same parameters as command line options can be used
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Selection metric
    #[arg(short = 's', long, value_enum)]
    metric: Option<MetricArg>,
    /// Path to the OpenVPN executable
    #[arg(short = 'o', long)]
    vpn_path: Option<String>,
    /// Directory of .ovpn config files used to discover server names
    #[arg(short = 'p', long)]
    config_dir: Option<PathBuf>,
    /// Pattern matched against the start of server names to restrict selection
    #[arg(short = 'r', long)]
    filter: Option<String>,
    /// Print additional information (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Transport used for the connection
    #[arg(long, value_enum)]
    transport: Option<TransportArg>,
    /// Print the connect command instead of executing it
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MetricArg {
    Latency,
    Load,
    LatencyThenLoad,
}

impl From<MetricArg> for SelectionMetric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Latency => SelectionMetric::Latency,
            MetricArg::Load => SelectionMetric::Load,
            MetricArg::LatencyThenLoad => SelectionMetric::LatencyThenLoad,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TransportArg {
    Udp,
    Tcp,
}

impl From<TransportArg> for Transport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Udp => Transport::Udp,
            TransportArg::Tcp => Transport::Tcp,
        }
    }
}

/// 配置文件提供基础值，命令行参数覆盖
fn merged_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => config::loader::load_config_from_path(path)?,
        None => Config::default(),
    };

    if let Some(metric) = cli.metric {
        config.metric = metric.into();
    }
    if let Some(vpn_path) = &cli.vpn_path {
        config.vpn_path = vpn_path.clone();
    }
    if let Some(dir) = &cli.config_dir {
        config.config_dir = Some(dir.clone());
    }
    if let Some(filter) = &cli.filter {
        config.filter = Some(filter.clone());
    }
    if let Some(transport) = cli.transport {
        config.transport = transport.into();
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = merged_config(&cli)?;

    let config_dir = config.config_dir.clone().context(
        "no candidate directory given; pass --config-dir or set config_dir in the config file",
    )?;

    let candidates = tunnelpick_core::discover_candidates(&config_dir)?;
    if candidates.is_empty() {
        anyhow::bail!(
            "no .ovpn candidate files found in {}",
            config_dir.display()
        );
    }

    let filter = config
        .filter
        .as_deref()
        .map(tunnelpick_core::compile_filter)
        .transpose()?;

    let runner = Arc::new(PingRunner::new(Duration::from_secs(
        config.probe.timeout_seconds,
    )));
    let service = SelectionService::new(
        LatencyProber::new(runner, config.probe.tries),
        LoadFetcher::new(&config.load_api)?,
    );

    let chosen = service
        .select(&candidates, config.metric, filter.as_ref())
        .await?;
    println!("Best server in area: {chosen}");

    let options = connector::ConnectOptions {
        vpn_path: config.vpn_path.clone(),
        config_dir,
        transport: config.transport,
        dry_run: cli.dry_run,
    };
    connector::connect(&chosen, &options).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // 中断必须在连接前放弃整次选择
    tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, aborting selection without connecting");
            std::process::exit(130);
        }
    }
}
