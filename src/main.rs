//! split-ledger server entry point.
//!
//! Opens the local record store for the configured user, starts background
//! sync against the remote store, and serves the REST and WebSocket
//! endpoints until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use split_ledger::api;
use split_ledger::app_state::AppState;
use split_ledger::config::LedgerConfig;
use split_ledger::identity::SessionIdentity;
use split_ledger::persistence::{FileStorage, PostgresRemote};
use split_ledger::session::LedgerSession;
use split_ledger::sync::{InMemoryRemote, RemoteGateway};
use split_ledger::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config =
        LedgerConfig::from_env().map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    tracing::info!(addr = %config.listen_addr, user_id = %config.user_id, "starting split-ledger");

    let identity = Arc::new(SessionIdentity::signed_in(
        config.user_id.clone(),
        config.start_online,
    ));
    if let Some(remote_id) = &config.remote_id {
        identity.link_remote_id(remote_id.clone())?;
    }

    let storage = Arc::new(
        FileStorage::open(config.data_dir.clone())
            .with_context(|| format!("opening {}", config.data_dir.display()))?,
    );

    let remote: Arc<dyn RemoteGateway> = match &config.remote_database_url {
        Some(url) => {
            let remote = PostgresRemote::connect(
                url,
                config.remote_max_connections,
                config.remote_connect_timeout(),
            )
            .await
            .context("connecting to the remote store")?;
            remote.ensure_schema().await?;
            tracing::info!("remote store: postgres");
            Arc::new(remote)
        }
        None => {
            tracing::warn!("REMOTE_DATABASE_URL not set; remote store is in-memory");
            Arc::new(InMemoryRemote::new())
        }
    };

    let session = Arc::new(
        LedgerSession::start(
            identity,
            storage,
            remote,
            config.sync_config(),
            config.event_bus_capacity,
        )
        .await?,
    );

    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TimeoutLayer::new(config.http_request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(Arc::clone(&session)));

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "cannot listen for ctrl-c");
            }
        })
        .await?;

    match Arc::try_unwrap(session) {
        Ok(session) => session.shutdown(),
        Err(session) => session.sync().shutdown(),
    }
    tracing::info!("split-ledger stopped");
    Ok(())
}
