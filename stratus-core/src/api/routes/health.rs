//! Liveness routes.

use axum::{Json, Router, extract::State, routing::get};

use crate::api::models::PingResponse;
use crate::api::server::AppState;

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(ping))
}

#[utoipa::path(
    get,
    path = "/ping",
    tag = "health",
    responses((status = 200, description = "Core process is alive", body = PingResponse))
)]
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    Json(PingResponse {
        uptime: state.start_time.elapsed().as_secs(),
    })
}
