//! Spawns a full server on an ephemeral port for end-to-end tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use split_ledger::api;
use split_ledger::app_state::AppState;
use split_ledger::identity::SessionIdentity;
use split_ledger::persistence::MemoryStorage;
use split_ledger::session::LedgerSession;
use split_ledger::sync::{InMemoryRemote, RemoteGateway, SyncConfig};
use split_ledger::ws::handler::ws_handler;
use tokio::task::JoinHandle;

/// A running server plus handles on its collaborators.
#[derive(Debug)]
pub struct TestServer {
    /// Address the server listens on, e.g. `127.0.0.1:41234`.
    pub addr: std::net::SocketAddr,
    /// Session served by the server.
    pub session: Arc<LedgerSession>,
    /// Remote store shared with the session.
    pub remote: Arc<InMemoryRemote>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// HTTP URL of `path`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// WebSocket URL of the `/ws` endpoint.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
        self.session.sync().shutdown();
    }
}

/// Sync timing short enough for real-time tests.
pub fn fast_sync() -> SyncConfig {
    SyncConfig {
        debounce: Duration::from_millis(50),
        min_interval: Duration::ZERO,
        periodic_interval: None,
        remote_timeout: Duration::from_secs(2),
    }
}

/// Starts a server for `user` backed by in-memory storage and remote.
#[allow(clippy::panic)]
pub async fn spawn_server(user: &str) -> TestServer {
    let remote = Arc::new(InMemoryRemote::new());
    let gateway: Arc<dyn RemoteGateway> = Arc::clone(&remote) as Arc<dyn RemoteGateway>;
    let identity = Arc::new(SessionIdentity::signed_in(user, true));
    let Ok(session) = LedgerSession::start(
        identity,
        Arc::new(MemoryStorage::new()),
        gateway,
        fast_sync(),
        256,
    )
    .await
    else {
        panic!("session should start");
    };
    let session = Arc::new(session);

    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .with_state(AppState::new(Arc::clone(&session)));

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind should succeed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener should have an address");
    };
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestServer {
        addr,
        session,
        remote,
        handle,
    }
}
