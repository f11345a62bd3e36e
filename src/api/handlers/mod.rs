//! REST endpoint handlers organized by resource.

pub mod active_group;
pub mod expenses;
pub mod groups;
pub mod sync;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(groups::routes())
        .merge(expenses::routes())
        .merge(active_group::routes())
        .merge(sync::routes())
}
