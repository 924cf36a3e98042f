//! sme-gateway: Thai SME LINE Bot main binary
//!
//! LINE Webhook と管理ダッシュボードを 1 つのポートで提供します。
//!
//! Usage:
//!   sme-gateway           - Start the webhook + admin dashboard
//!   sme-gateway --help    - Show help
//!   sme-gateway --version - Show version

mod cli;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use sme_core::{Config, LogStore, SystemLogLayer};
use sme_dashboard::{DashboardServer, DashboardState};
use sme_line::LineBot;

use cli::RunMode;

/// Log rows older than this are deleted
const RETENTION_DAYS: i64 = 30;
const RETENTION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match cli::parse_args(std::env::args().skip(1)) {
        RunMode::Help => {
            cli::print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("sme-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server => {}
    }

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    // The log layer needs the store, so open it before logging starts
    let (log_store, store_error) = match LogStore::from_config(&config.database) {
        Ok(store) => (store, None),
        Err(e) => (LogStore::console_only(), Some(e)),
    };

    init_tracing(&log_store)?;

    if let Some(e) = store_error {
        warn!("Database unavailable, falling back to console-only logging: {}", e);
    }

    info!("Starting sme-gateway {}...", env!("CARGO_PKG_VERSION"));
    info!("Azure OpenAI deployment: {}", config.azure.deployment);
    info!(
        "Log storage: {}",
        if log_store.is_enabled() { config.database.path.as_str() } else { "console only" }
    );

    if let Err(e) = config.validate() {
        error!("{}", e);
        return Err(e.into());
    }

    run_server(config, log_store).await
}

/// Console output plus WARN/ERROR persistence into `system_logs`
fn init_tracing(log_store: &LogStore) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(SystemLogLayer::new(log_store.clone()))
        .try_init()
        .context("Failed to initialize logging")
}

/// Serve webhook + dashboard until Ctrl+C
async fn run_server(config: Config, log_store: LogStore) -> anyhow::Result<()> {
    let bot = LineBot::new(&config, log_store.clone()).context("Failed to create LINE bot")?;

    let mut background = bot.start_background_tasks();
    if log_store.is_enabled() {
        background.push(spawn_retention_task(log_store.clone()));
    }

    let missing: Vec<String> = config.missing_required().into_iter().map(String::from).collect();
    let state = DashboardState::new(Arc::new(log_store))
        .with_admin_api_key(config.server.admin_api_key.clone())
        .with_missing_env_vars(missing);

    let server = DashboardServer::new(&config.server, state).merge(bot.router());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let mut server_handle = tokio::spawn(server.run(shutdown_rx));

    info!("sme-gateway initialized successfully");
    info!("Press Ctrl+C to exit");

    let shutdown_requested = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            true
        }
        result = &mut server_handle => {
            result??;
            false
        }
    };

    if shutdown_requested {
        info!("Shutting down...");
        let _ = shutdown_tx.send(());
        server_handle.await??;
    }

    for handle in background {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}

/// Delete old log rows once a day
fn spawn_retention_task(store: LogStore) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RETENTION_INTERVAL);
        loop {
            interval.tick().await;
            let store = store.clone();
            match tokio::task::spawn_blocking(move || store.cleanup_older_than(RETENTION_DAYS)).await {
                Ok(Ok(removed)) => debug!("Retention pass removed {} rows", removed),
                Ok(Err(e)) => warn!("Log retention failed: {}", e),
                Err(e) => warn!("Log retention task panicked: {}", e),
            }
        }
    })
}
