//! REST API layer: route handlers, DTOs, OpenAPI document, and router
//! composition.
//!
//! Resource endpoints are mounted under `/api/v1`; health, session and the
//! OpenAPI document live at the root.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .merge(openapi::routes())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tokio_test::assert_ok;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::SyncPhase;
    use crate::identity::SessionIdentity;
    use crate::persistence::MemoryStorage;
    use crate::session::LedgerSession;
    use crate::sync::{InMemoryRemote, SyncConfig};

    async fn app() -> (Router, Arc<LedgerSession>) {
        let session = assert_ok!(
            LedgerSession::start(
                Arc::new(SessionIdentity::signed_in("alice", true)),
                Arc::new(MemoryStorage::new()),
                Arc::new(InMemoryRemote::new()),
                SyncConfig::default(),
                64,
            )
            .await
        );
        let session = Arc::new(session);
        let router = build_router().with_state(AppState::new(Arc::clone(&session)));
        (router, session)
    }

    async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = assert_ok!(router.clone().oneshot(request).await);
        let status = response.status();
        let bytes = assert_ok!(to_bytes(response.into_body(), usize::MAX).await);
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            assert_ok!(serde_json::from_slice(&bytes))
        };
        (status, body)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        assert_ok!(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
        )
    }

    fn get(uri: &str) -> Request<Body> {
        assert_ok!(Request::get(uri).body(Body::empty()))
    }

    #[tokio::test]
    async fn missing_group_maps_to_not_found() {
        let (router, _session) = app().await;
        let (status, body) = call(&router, get("/api/v1/groups/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], 2002);
    }

    #[tokio::test]
    async fn group_without_participants_is_bad_request() {
        let (router, _session) = app().await;
        let (status, body) = call(
            &router,
            post_json(
                "/api/v1/groups",
                &json!({ "name": "Empty", "currency": "EUR", "participants": [] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 1001);
    }

    #[tokio::test]
    async fn list_paginates() {
        let (router, _session) = app().await;
        for name in ["One", "Two", "Three"] {
            let (status, _) = call(
                &router,
                post_json(
                    "/api/v1/groups",
                    &json!({ "name": name, "currency": "EUR", "participants": ["Alice"] }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, body) = call(&router, get("/api/v1/groups?page=2&perPage=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["total"], 3);
        assert_eq!(body["pagination"]["totalPages"], 2);
        assert_eq!(body["data"][0]["name"], "Three");
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn reading_groups_arms_a_navigation_sync() {
        let (router, session) = app().await;
        assert_eq!(session.sync().phase(), SyncPhase::Idle);
        let (status, _) = call(&router, get("/api/v1/groups")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session.sync().phase(), SyncPhase::Debouncing);
    }

    #[tokio::test]
    async fn health_is_served_at_root() {
        let (router, _session) = app().await;
        let (status, body) = call(&router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }
}
