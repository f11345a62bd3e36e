//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered change events.

use std::str::FromStr;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::api::dto::SyncStatusResponse;
use crate::app_state::AppState;
use crate::domain::{ChangeEvent, Collection};
use crate::identity::IdentityProvider;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards change events of subscribed collections to the client.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<ChangeEvent>,
    state: AppState,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_text_message(&text, &mut subs, &state).await;
                        if let Some(json) = reply
                            && ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(change) => {
                        if !subs.matches(change.snapshot.collection()) {
                            continue;
                        }
                        let Ok(payload) = serde_json::to_value(&change) else {
                            continue;
                        };
                        let msg = WsMessage::new(
                            uuid::Uuid::new_v4().to_string(),
                            WsMessageType::Event,
                            payload,
                        );
                        let Ok(json) = serde_json::to_string(&msg) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Splits collection names into known collections and the wildcard flag.
/// Unknown names are ignored.
fn parse_collections(names: &[String]) -> (Vec<Collection>, bool) {
    let mut collections = Vec::new();
    let mut wildcard = false;
    for name in names {
        if name == "*" {
            wildcard = true;
        } else if let Ok(collection) = Collection::from_str(name) {
            collections.push(collection);
        } else {
            tracing::debug!(%name, "ignoring unknown collection in ws subscription");
        }
    }
    (collections, wildcard)
}

fn names(collections: &[Collection]) -> Vec<&'static str> {
    collections.iter().map(Collection::as_str).collect()
}

/// Handles a text message from the client, returning an optional JSON reply.
async fn handle_text_message(
    text: &str,
    subs: &mut SubscriptionManager,
    state: &AppState,
) -> Option<String> {
    let reply = match serde_json::from_str::<WsMessage>(text) {
        Err(_) => WsMessage::error("", 400, "malformed JSON"),
        Ok(msg) if msg.msg_type != WsMessageType::Command => {
            WsMessage::error(msg.id, 400, "expected a command message")
        }
        Ok(msg) => match serde_json::from_value::<WsCommand>(msg.payload) {
            Ok(command) => execute(msg.id, command, subs, state).await,
            Err(_) => WsMessage::error(msg.id, 404, "unknown command"),
        },
    };
    serde_json::to_string(&reply).ok()
}

async fn execute(
    id: String,
    command: WsCommand,
    subs: &mut SubscriptionManager,
    state: &AppState,
) -> WsMessage {
    let payload = match command {
        WsCommand::Subscribe { collections } => {
            let (collections, wildcard) = parse_collections(&collections);
            subs.subscribe(&collections, wildcard);
            serde_json::json!({
                "subscribed": names(&collections),
                "collections": names(&subs.collections()),
                "wildcard": subs.is_subscribed_all(),
            })
        }
        WsCommand::Unsubscribe { collections } => {
            let (collections, wildcard) = parse_collections(&collections);
            subs.unsubscribe(&collections, wildcard);
            serde_json::json!({
                "unsubscribed": names(&collections),
                "collections": names(&subs.collections()),
                "wildcard": subs.is_subscribed_all(),
            })
        }
        WsCommand::SyncStatus => {
            let status = SyncStatusResponse {
                phase: state.sync().phase(),
                online: state.session.identity().is_online(),
                state: state.sync().status(),
            };
            match serde_json::to_value(status) {
                Ok(value) => value,
                Err(e) => return WsMessage::error(id, 500, e.to_string()),
            }
        }
        WsCommand::ForceSync => {
            let outcome = match state.sync().force_sync().await {
                Ok(outcome) => outcome,
                Err(e) => return WsMessage::error(id, 401, e.to_string()),
            };
            match serde_json::to_value(outcome) {
                Ok(value) => value,
                Err(e) => return WsMessage::error(id, 500, e.to_string()),
            }
        }
    };
    WsMessage::new(id, WsMessageType::Response, payload)
}
