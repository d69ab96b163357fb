mod cli;

use crate::cli::{StoreBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use jiff::Timestamp;
use std::sync::Arc;
use std::time::Duration;
use tally_core::{InMemoryStore, Store};
use tally_redirector::{bootstrap, server, App, AppState, CorsPolicy, RedirectTarget, ServiceConfig};
use tally_storage::SqliteStore;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    tally_telemetry::init(config.log_format)?;

    let target = RedirectTarget::new(config.redirect_target.clone(), config.counter_param.clone())?;
    let cors = CorsPolicy::new(&config.allowed_origins)?;
    let listen_addr = config.listen_addr();

    info!(
        listen_addr = %listen_addr,
        store_backend = %config.store,
        redirect_target = %target.base(),
        counter_param = %target.param(),
        "starting redirect server"
    );

    let store: Arc<dyn Store> = match config.store {
        StoreBackendArg::Sqlite => {
            let database_url = config
                .database_url
                .as_deref()
                .context("database url is required when store backend is sqlite")?;
            Arc::new(SqliteStore::connect(database_url).await?)
        }
        StoreBackendArg::Memory => Arc::new(InMemoryStore::new()),
    };

    let counter = Arc::new(bootstrap::start(store.as_ref()).await?);

    let service_config = ServiceConfig::builder()
        .target(target)
        .cors(cors)
        .store_timeout(Duration::from_millis(config.store_timeout_ms))
        .stats_timeout(Duration::from_millis(config.stats_timeout_ms))
        .service_started_at(
            config
                .service_started_at
                .unwrap_or_else(|| Timestamp::now().to_string()),
        )
        .build();
    let router = App::router(AppState::new(counter, store, service_config));

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    server::serve(listener, router, server::shutdown_signal()).await?;
    info!("server stopped");

    Ok(())
}
