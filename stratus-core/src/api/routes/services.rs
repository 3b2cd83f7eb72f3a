//! Service registry routes.

use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get},
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{
    AckResponse, ListServicesQuery, Payload, RegisterServiceRequest, ServiceResponse,
    ServicesListResponse,
};
use crate::api::server::AppState;
use crate::error::Error;
use crate::registry::{Protocol, ServiceType};

/// Create the services router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_services).post(register_service))
        .route("/{id}", delete(unregister_service))
}

/// Read-only subset served on the public surface.
pub fn read_only_router() -> Router<AppState> {
    Router::new().route("/", get(list_services))
}

fn parse_service_type(raw: &str) -> Result<ServiceType, ApiError> {
    ServiceType::from_str(raw)
        .map_err(|_| ApiError::validation(format!("unknown service type '{raw}'")))
}

fn parse_protocol(raw: &str) -> Result<Protocol, ApiError> {
    Protocol::from_str(raw).map_err(|_| ApiError::validation(format!("unknown protocol '{raw}'")))
}

#[utoipa::path(
    get,
    path = "/service",
    tag = "services",
    params(
        ("name" = Option<String>, Query, description = "Filter by exact service name"),
        ("type" = Option<String>, Query, description = "Filter by service type")
    ),
    responses(
        (status = 200, description = "Matching services, empty when nothing matches", body = ServicesListResponse),
        (status = 400, description = "Invalid filter value", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<ListServicesQuery>,
) -> ApiResult<Json<ServicesListResponse>> {
    let service_type = query
        .service_type
        .as_deref()
        .map(parse_service_type)
        .transpose()?;

    let records = if query.name.is_none() && service_type.is_none() {
        state.registry.all()
    } else {
        // A filter that matches nothing is an empty list here, not an
        // error like it is for direct registry lookups.
        match state.registry.find(query.name.as_deref(), service_type) {
            Ok(records) => records,
            Err(Error::NotFound { .. }) => Vec::new(),
            Err(e) => return Err(e.into()),
        }
    };

    let services = records.iter().map(ServiceResponse::from).collect();
    Ok(Json(ServicesListResponse { services }))
}

#[utoipa::path(
    post,
    path = "/service",
    tag = "services",
    request_body = RegisterServiceRequest,
    responses(
        (status = 200, description = "Service registered", body = AckResponse),
        (status = 400, description = "Validation failure or uniqueness conflict", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn register_service(
    State(state): State<AppState>,
    Payload(request): Payload<RegisterServiceRequest>,
) -> ApiResult<Json<AckResponse>> {
    let service_type = parse_service_type(&request.service_type)?;
    let protocol = match request.protocol.as_deref() {
        Some(raw) => parse_protocol(raw)?,
        None => Protocol::default(),
    };

    let record = state.registry.register(
        &request.name,
        service_type,
        &request.address,
        request.service_port,
        request.management_port,
        protocol,
    )?;

    Ok(Json(AckResponse {
        id: record.id.clone(),
        message: format!("registered service '{}'", record.name),
    }))
}

#[utoipa::path(
    delete,
    path = "/service/{id}",
    tag = "services",
    params(("id" = String, Path, description = "Service id")),
    responses(
        (status = 200, description = "Service unregistered", body = AckResponse),
        (status = 400, description = "Unknown service id", body = crate::api::error::ApiErrorResponse)
    )
)]
pub async fn unregister_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AckResponse>> {
    let record = state.registry.unregister(&id)?;
    Ok(Json(AckResponse {
        id: record.id.clone(),
        message: format!("unregistered service '{}'", record.name),
    }))
}
