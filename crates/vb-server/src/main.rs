#![deny(unsafe_code)]
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vb_server::{build_app, AppState};

#[derive(Parser, Debug)]
#[command(name = "vb-server", version, about = "VectorBid pipeline orchestrator")]
struct Args {
    /// Bind address.
    #[arg(long, default_value = "127.0.0.1:8088")]
    bind: String,

    /// Path to a TOML config file; falls back to built-in defaults plus
    /// environment overrides when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable request/response debug logging.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("vb_server=debug,vb_optimizer=debug,vb_rulepack=debug,info")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = vb_config::load_config(args.config.as_deref())
        .with_context(|| "loading configuration")?;

    for warning in vb_config::validate_config(&config).context("validating configuration")? {
        warn!("{warning}");
    }

    tokio::fs::create_dir_all(&config.rule_packs_dir)
        .await
        .with_context(|| format!("create rule packs dir {}", config.rule_packs_dir))?;
    tokio::fs::create_dir_all(&config.packages_dir)
        .await
        .with_context(|| format!("create packages dir {}", config.packages_dir))?;

    let state = Arc::new(AppState::new(config).context("building application state")?);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("bind {}", args.bind))?;
    info!(bind = %args.bind, "vb-server listening");

    axum::serve(listener, app).await.context("serve")
}
