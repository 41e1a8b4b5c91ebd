//! Assembles the Axum [`Router`] for the `/crud/` surface.

use std::sync::Arc;

use axum::{routing::any, Router};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{crud, AppState},
    resource::ResourceRegistry,
    storage::Storage,
};

/// Build the complete application router with shared state.
///
/// Every verb reaches the CRUD handlers; each resource's verb gate decides
/// what is allowed.
pub fn build_router(storage: Arc<dyn Storage>, resources: ResourceRegistry) -> Router {
    let state = AppState {
        storage,
        resources: Arc::new(resources),
    };

    Router::new()
        .route("/crud/{resource}", any(crud::collection))
        .route("/crud/{resource}/", any(crud::collection))
        .route("/crud/{resource}/{pk}", any(crud::member))
        .route("/crud/{resource}/{pk}/", any(crud::member))
        .fallback(crud::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
