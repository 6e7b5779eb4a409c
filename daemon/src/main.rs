//! Circles daemon: entry point for the follow and directory service.

mod config;
mod shutdown;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;

use circles_api::{ApiMetrics, ApiServer, AppState, JwtConfig};
use circles_store::MembershipStore;
use circles_store_lmdb::environment::MAX_DBS;
use circles_store_lmdb::{LmdbEnvironment, LmdbMembershipStore};
use circles_types::{Group, User};
use circles_utils::{init_logging, LogFormat};

use crate::config::ServiceConfig;
use crate::shutdown::ShutdownController;

#[derive(Parser)]
#[command(name = "circles-daemon", about = "Group follow and directory search service")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "CIRCLES_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB environment.
    #[arg(long, env = "CIRCLES_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Address for the HTTP server, e.g. "0.0.0.0:5000".
    #[arg(long, env = "CIRCLES_BIND_ADDR")]
    bind_addr: Option<SocketAddr>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "CIRCLES_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "CIRCLES_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Enable Prometheus metrics endpoint.
    #[arg(long, env = "CIRCLES_ENABLE_METRICS")]
    metrics: bool,

    /// HS256 secret used to verify bearer tokens.
    #[arg(long, env = "CIRCLES_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve,
    /// Load users and groups from a JSON file (`{"users": [...], "groups": [...]}`).
    Import {
        file: PathBuf,
    },
    /// Report pairs whose follow and membership fields disagree.
    Audit,
}

#[derive(Deserialize)]
struct ImportFile {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    groups: Vec<Group>,
}

fn load_config(cli: &Cli) -> anyhow::Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_toml_file(path)?,
        None => ServiceConfig::default(),
    };

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(addr) = cli.bind_addr {
        config.bind_addr = addr;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if cli.jwt_secret.is_some() {
        config.jwt_secret = cli.jwt_secret.clone();
    }
    config.enable_metrics |= cli.metrics;
    Ok(config)
}

fn open_store(config: &ServiceConfig) -> anyhow::Result<LmdbMembershipStore> {
    let env = LmdbEnvironment::open(&config.data_dir, MAX_DBS, config.map_size_bytes())
        .with_context(|| format!("opening store at {}", config.data_dir.display()))?;
    Ok(env.membership_store())
}

async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    let secret = config
        .jwt_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .context("a JWT secret is required: set CIRCLES_JWT_SECRET or --jwt-secret")?;

    let store: Arc<dyn MembershipStore> = Arc::new(open_store(&config)?);
    tracing::info!(
        users = store.user_count()?,
        groups = store.group_count()?,
        "store ready"
    );

    let mut state = AppState::new(store, JwtConfig::from_secret(secret.as_bytes()))
        .with_repair_on_read(config.membership.repair_on_read);
    if config.enable_metrics {
        state = state.with_metrics(Arc::new(ApiMetrics::new()?));
    }

    let shutdown = ShutdownController::new();
    let server = ApiServer::new(config.bind_addr, state).with_cors(config.cors_allow_any);
    let signalled = shutdown.signalled();

    let listener = shutdown.clone();
    tokio::spawn(async move { listener.listen().await });

    tracing::info!(
        addr = %config.bind_addr,
        metrics = config.enable_metrics,
        repair_on_read = config.membership.repair_on_read,
        "starting Circles service"
    );
    server.serve(signalled).await?;
    tracing::info!("Circles daemon exited cleanly");
    Ok(())
}

fn import(config: &ServiceConfig, file: &Path) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let records: ImportFile = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {}", file.display()))?;

    let store = open_store(config)?;
    store.import(&records.users, &records.groups)?;
    tracing::info!(
        users = records.users.len(),
        groups = records.groups.len(),
        "import complete"
    );
    Ok(())
}

fn audit(config: &ServiceConfig) -> anyhow::Result<bool> {
    let store = open_store(config)?;
    let drift = circles_membership::audit(&store)?;
    println!("{}", serde_json::to_string_pretty(&drift)?);
    tracing::info!(pairs = drift.len(), "audit complete");
    Ok(drift.is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level)?;

    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "loaded config");
    }

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Import { file } => import(&config, &file),
        Command::Audit => {
            if !audit(&config)? {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
