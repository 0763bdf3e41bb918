//! CLI binary for taskbot.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use taskbot::config::{ConfigSeverity, LoggingConfig};
use taskbot::{BotConfig, BotRuntime};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Taskbot: a chat-driven task manager with reminders.
#[derive(Parser)]
#[command(name = "taskbot", version, about)]
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
    /// Run the bot until Ctrl+C.
    Run,

    /// Validate the configuration and print any issues.
    CheckConfig,

    /// Write a default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(BotConfig::default_config_path);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            let config = load_config(&config_path)?;
            let _guard = init_tracing(&config.logging);
            run(config).await
        }
        Command::CheckConfig => check_config(&load_config(&config_path)?),
        Command::InitConfig { force } => init_config(&config_path, force),
    }
}

/// Load the config file, falling back to defaults when it does not exist.
fn load_config(path: &Path) -> anyhow::Result<BotConfig> {
    if path.exists() {
        Ok(BotConfig::from_file(path)?)
    } else {
        Ok(BotConfig::default())
    }
}

/// Log to stderr, plus a daily-rotated file when a log directory is set.
fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("taskbot=info"));
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match &logging.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

async fn run(config: BotConfig) -> anyhow::Result<()> {
    let blocking: Vec<_> = config
        .validate()
        .into_iter()
        .filter(|issue| {
            if issue.severity == ConfigSeverity::Warning {
                tracing::warn!("{}: {}", issue.id, issue.summary);
            }
            issue.severity == ConfigSeverity::Error
        })
        .collect();
    if let Some(issue) = blocking.first() {
        anyhow::bail!("invalid configuration ({}): {}", issue.id, issue.summary);
    }

    let runtime = BotRuntime::new(config);
    let cancel = runtime.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down...");
            cancel.cancel();
        }
    });

    info!("taskbot v{}", env!("CARGO_PKG_VERSION"));
    runtime.run().await
}

fn check_config(config: &BotConfig) -> anyhow::Result<()> {
    let issues = config.validate();
    if issues.is_empty() {
        println!("Configuration OK.");
        return Ok(());
    }
    for issue in &issues {
        let level = match issue.severity {
            ConfigSeverity::Warning => "warning",
            ConfigSeverity::Error => "error",
        };
        println!("{level} [{}] {}", issue.id, issue.summary);
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!("configuration has errors");
    }
    Ok(())
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    BotConfig::default().save_to_file(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
