//! HTTP request handlers for the `/crud/` surface.
//!
//! Handlers are pure async functions that receive Axum extractors and return
//! `Result<impl IntoResponse, AppError>`. Everything record-specific lives in
//! the [`CrudResource`](crate::resource::CrudResource) the request resolves to.

pub mod crud;

use std::sync::Arc;

use crate::{resource::ResourceRegistry, storage::Storage};

/// Shared application state threaded through all Axum handlers via [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub resources: Arc<ResourceRegistry>,
}
