//! sitewatch daemon: polls the configured sites and pushes notifications
//! through the OneBot transport until interrupted.

use clap::{Parser, Subcommand};
use sitewatch::{Monitor, MonitorConfig};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Poll external sites and notify subscribed chat users and groups.
#[derive(Parser)]
#[command(name = "sitewatch", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Run the scheduler until Ctrl-C.
    Run,

    /// Poll one site once, notify its subscribers if it changed, and exit.
    Check {
        /// Site id.
        site: String,
    },

    /// List registered sites and their schedules.
    Sites,

    /// Write the default configuration to the config path.
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(MonitorConfig::default_config_path);
    let config = load_config(&config_path, cli.config.is_some())?;
    let _log_guard = init_tracing(&config);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&config).await,
        Command::Check { site } => check(&config, &site).await,
        Command::Sites => list_sites(&config),
        Command::InitConfig => {
            config.save_to_file(&config_path)?;
            println!("wrote {}", config_path.display());
            Ok(())
        }
    }
}

/// An explicit `--config` must exist; the default path is optional.
fn load_config(path: &Path, explicit: bool) -> anyhow::Result<MonitorConfig> {
    if explicit || path.exists() {
        Ok(MonitorConfig::from_file(path)?)
    } else {
        Ok(MonitorConfig::default())
    }
}

fn init_tracing(config: &MonitorConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));

    let (file_layer, guard) = if config.logging.file {
        let logs_dir = sitewatch::sitewatch_dirs::logs_dir();
        let appender = tracing_appender::rolling::daily(logs_dir, "sitewatch.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    guard
}

async fn run(config: &MonitorConfig) -> anyhow::Result<()> {
    info!("sitewatch starting");
    let mut monitor = Monitor::from_config(config)?;
    if monitor.scheduler().sites().next().is_none() {
        tracing::warn!("no sites configured; enable sites.example or add [[sites.http_json]]");
    }
    monitor.start();

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    monitor.shutdown().await;
    info!("sitewatch shut down cleanly");
    Ok(())
}

async fn check(config: &MonitorConfig, site: &str) -> anyhow::Result<()> {
    let monitor = Monitor::from_config(config)?;
    let outcome = monitor.run_now(site).await?;
    println!("{site}: {outcome}");
    Ok(())
}

fn list_sites(config: &MonitorConfig) -> anyhow::Result<()> {
    let monitor = Monitor::from_config(config)?;
    let scheduler = monitor.scheduler();
    for site in scheduler.sites() {
        let schedule = scheduler
            .schedule_of(site.id())
            .map_or_else(|| "unscheduled".to_owned(), ToString::to_string);
        println!("{:<16} {:<24} {}", site.id(), site.display_name(), schedule);
    }
    Ok(())
}
