//! `swarm-host` command-line entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use agent_config::HostConfig;
use agent_kernel::JsonFileSource;
use agent_telemetry::init_tracing;
use agent_validator::ContractValidator;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use swarm_host::SwarmHost;
use swarm_host::audit::{self, AuditSummary, FileReport};
use tracing::{info, warn};

/// Exposes agent contracts as invocable protocol tools.
#[derive(Parser)]
#[command(name = "swarm-host", version)]
#[command(about = "Contract-driven capability host speaking the tool-invocation protocol over stdio")]
struct Cli {
    /// Configuration file (JSON); `SWARM_*` variables (`__` between nested keys) override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load contracts and serve tools over stdin/stdout.
    Serve,
    /// Validate contract files or the configured source.
    Validate {
        /// Validate a single file.
        #[arg(long, conflicts_with_all = ["all", "source"])]
        file: Option<PathBuf>,
        /// Validate every `.json` file in `--dir`.
        #[arg(long, conflicts_with = "source")]
        all: bool,
        /// Directory scanned by `--all`.
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Validate the records of the configured contract source.
        #[arg(long)]
        source: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = HostConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.telemetry).context("failed to initialise tracing")?;

    match cli.command {
        Commands::Serve => serve(&config).await,
        Commands::Validate {
            file,
            all,
            dir,
            source,
        } => validate(&config, file, all.then_some(dir), source).await,
    }
}

async fn serve(config: &HostConfig) -> Result<ExitCode> {
    let host = SwarmHost::new(config).context("failed to build swarm host")?;
    host.initialize().await.context("initial contract load failed")?;

    #[cfg(unix)]
    spawn_reload_on_hangup(host.clone())?;

    tokio::select! {
        served = host.serve_stdio() => served.context("protocol server failed")?,
        _ = tokio::signal::ctrl_c() => info!("interrupted; shutting down"),
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(unix)]
fn spawn_reload_on_hangup(host: SwarmHost) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangups = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;
    tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            info!("SIGHUP received; refreshing contracts");
            if let Err(err) = host.refresh().await {
                warn!(error = %err, "refresh failed; previous bindings remain");
            }
        }
    });
    Ok(())
}

async fn validate(config: &HostConfig, file: Option<PathBuf>, dir: Option<PathBuf>, source: bool) -> Result<ExitCode> {
    let validator = ContractValidator::new(&config.validation);

    let files: Vec<FileReport> = match (file, dir, source) {
        (Some(file), _, _) => audit::validate_files(&validator, &[file]).await,
        (None, Some(dir), _) => {
            let paths = audit::json_files_in(&dir)
                .await
                .with_context(|| format!("failed to list {}", dir.display()))?;
            if paths.is_empty() {
                warn!(dir = %dir.display(), "no contract files found");
            }
            audit::validate_files(&validator, &paths).await
        }
        (None, None, true) => {
            let path = &config.source.contracts_path;
            let source = JsonFileSource::new(path);
            let report = audit::validate_source(&validator, &source, path, config.source.page_size)
                .await
                .context("failed to read contract source")?;
            vec![report]
        }
        (None, None, false) => bail!("choose one of --file, --all, or --source"),
    };

    for file in &files {
        eprint!("{}", file.render());
    }
    let summary = AuditSummary::of(&files);
    eprintln!("{summary}");

    Ok(if summary.all_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
