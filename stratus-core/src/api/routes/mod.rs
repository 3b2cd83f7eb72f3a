//! API route modules.
//!
//! Organizes routes by resource. The management surface carries the full
//! registry API; the public surface carries read-only lookups, liveness,
//! and the interactive API docs.

pub mod health;
pub mod interests;
pub mod services;

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::openapi::ApiDoc;
use crate::api::server::AppState;

/// Create the router for the management surface.
pub fn management_router(state: AppState) -> Router {
    Router::new()
        .nest("/service", services::router())
        .nest("/interest", interests::router())
        .nest("/ping", health::router())
        .with_state(state)
}

/// Create the router for the public surface.
pub fn public_router(state: AppState) -> Router {
    Router::new()
        .nest("/service", services::read_only_router())
        .nest("/ping", health::router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}
