//! OpenAPI documentation configuration.
//!
//! Generates the OpenAPI 3 document served alongside Swagger UI on the
//! public surface.

use utoipa::OpenApi;

use crate::api::error::ApiErrorResponse;
use crate::api::models::{
    AckResponse, PingResponse, RegisterInterestRequest, RegisterServiceRequest, ServiceResponse,
    ServicesListResponse,
};

/// OpenAPI documentation for the core API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stratus Core API",
        version = "0.1.0",
        description = "Service registry, configuration interests, and liveness endpoints of the Stratus core service.",
        license(name = "MIT OR Apache-2.0")
    ),
    tags(
        (name = "services", description = "Service registry endpoints"),
        (name = "interests", description = "Configuration interest endpoints"),
        (name = "health", description = "Liveness endpoints")
    ),
    paths(
        crate::api::routes::services::list_services,
        crate::api::routes::services::register_service,
        crate::api::routes::services::unregister_service,
        crate::api::routes::interests::register_interest,
        crate::api::routes::interests::unregister_interest,
        crate::api::routes::health::ping,
    ),
    components(schemas(
        RegisterServiceRequest,
        RegisterInterestRequest,
        AckResponse,
        ServiceResponse,
        ServicesListResponse,
        PingResponse,
        ApiErrorResponse,
    ))
)]
pub struct ApiDoc;
