//! Salien Agent - unattended client for the Saliens territory minigame
//!
//! Runs one session per configured account:
//! - Scans every planet and joins the hardest (or boss) zone
//! - Reports the round score and keeps the remote session on the right planet
//! - Restarts from a fresh scan after any failure

mod config;
mod updater;

use anyhow::{Context, Result};
use clap::Parser;
use config::{AccountConfig, AgentConfig};
use salien_core::{ReqwestTransport, Session};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};
use updater::UpdateChecker;

const DEFAULT_LOG_FILTER: &str = "salien_core=info,salien_agent=info";

#[derive(Debug, Parser)]
#[command(name = "salien-agent", version, about = "Plays the Saliens minigame unattended")]
struct Args {
    /// Your Saliens game token
    #[arg(short, long, conflicts_with = "token_file")]
    token: Option<String>,

    /// Read the game token from a file
    #[arg(long)]
    token_file: Option<PathBuf>,

    /// ID of a Steam group to represent
    #[arg(short, long)]
    group: Option<u64>,

    /// Name shown in the logs for this instance
    #[arg(short, long)]
    name: Option<String>,

    /// Only play on this planet while it has open zones
    #[arg(short, long)]
    planet: Option<String>,

    /// Log every Steam API request
    #[arg(short, long)]
    log_requests: bool,

    /// Config file (defaults to the OS config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "salien_core=debug,salien_agent=debug"
    } else {
        DEFAULT_LOG_FILTER
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// File, then `SALIEN_CONFIG`, then command line
async fn resolve_config(args: &Args) -> Result<AgentConfig> {
    let mut config = AgentConfig::load(args.config.as_deref())
        .await
        .context("Failed to load config")?;
    config.apply_env()?;

    let token = match (&args.token, &args.token_file) {
        (Some(token), _) => Some(token.clone()),
        (None, Some(path)) => Some(config::read_token_file(path).await?),
        (None, None) => None,
    };

    if let Some(token) = token {
        config.accounts = vec![AccountConfig {
            token,
            clan_id: args.group,
            name: args.name.clone(),
        }];
    } else if args.group.is_some() || args.name.is_some() {
        warn!("--group and --name only apply together with --token or --token-file");
    }

    if args.planet.is_some() {
        config.planet = args.planet.clone();
    }
    config.log_requests |= args.log_requests;

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(args.verbose);

    info!("Salien Agent {} starting...", env!("CARGO_PKG_VERSION"));

    let config = resolve_config(&args).await?;

    if let Some(checker) = UpdateChecker::from_config(&config.update) {
        tokio::spawn(checker.run());
    }

    let transport = Arc::new(
        ReqwestTransport::new(config.request_timeout()).context("Failed to create HTTP client")?,
    );

    let mut sessions = JoinSet::new();
    for session_config in config.session_configs() {
        let name = session_config.name.clone();
        let mut session = Session::new(Arc::new(session_config), transport.clone());

        sessions.spawn(
            async move {
                let result = session.run().await;
                (session.config().name.clone(), result)
            }
            .instrument(info_span!("session", name = %name)),
        );
    }

    info!("Started {} session(s)", sessions.len());

    let mut failed = 0;
    while let Some(joined) = sessions.join_next().await {
        match joined {
            Ok((name, Ok(()))) => info!("Session {} finished", name),
            Ok((name, Err(err))) => {
                failed += 1;
                error!("Session {} stopped: {}", name, err);
            }
            Err(err) => {
                failed += 1;
                error!("Session task panicked: {}", err);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} session(s) stopped with an error", failed);
    }
    Ok(())
}
