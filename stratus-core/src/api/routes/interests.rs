//! Configuration interest routes.
//!
//! Interest registration depends on storage-backed configuration, which
//! comes up partway through bootstrap. Until the sequencer binds the
//! interest registry these endpoints answer 503.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, post},
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{AckResponse, Payload, RegisterInterestRequest};
use crate::api::server::AppState;
use crate::registry::InterestRegistry;

/// Create the interests router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(register_interest))
        .route("/{id}", delete(unregister_interest))
}

fn interests_or_unavailable(state: &AppState) -> Result<Arc<InterestRegistry>, ApiError> {
    state
        .interests()
        .ok_or_else(|| ApiError::service_unavailable("interest registration is not ready yet"))
}

#[utoipa::path(
    post,
    path = "/interest",
    tag = "interests",
    request_body = RegisterInterestRequest,
    responses(
        (status = 200, description = "Interest registered", body = AckResponse),
        (status = 400, description = "Validation failure or duplicate interest", body = crate::api::error::ApiErrorResponse),
        (status = 503, description = "Interest registry not ready", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn register_interest(
    State(state): State<AppState>,
    Payload(request): Payload<RegisterInterestRequest>,
) -> ApiResult<Json<AckResponse>> {
    let interests = interests_or_unavailable(&state)?;
    let record = interests
        .register(&request.service, &request.category)
        .await?;
    Ok(Json(AckResponse {
        id: record.id.clone(),
        message: format!(
            "registered interest in category '{}' for service '{}'",
            record.category_name, record.microservice_id
        ),
    }))
}

#[utoipa::path(
    delete,
    path = "/interest/{id}",
    tag = "interests",
    params(("id" = String, Path, description = "Interest id")),
    responses(
        (status = 200, description = "Interest unregistered", body = AckResponse),
        (status = 400, description = "Unknown interest id", body = crate::api::error::ApiErrorResponse),
        (status = 503, description = "Interest registry not ready", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn unregister_interest(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AckResponse>> {
    let interests = interests_or_unavailable(&state)?;
    let record = interests.unregister(&id)?;
    Ok(Json(AckResponse {
        id: record.id.clone(),
        message: format!(
            "unregistered interest in category '{}'",
            record.category_name
        ),
    }))
}
