//! API request and response models (DTOs).
//!
//! Request bodies decode fail-closed: every DTO carries
//! `#[serde(deny_unknown_fields)]`, required fields have no defaults, and
//! the [`Payload`] extractor turns every decode failure into a 400.

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use utoipa::ToSchema;

use super::error::ApiError;
use crate::registry::ServiceRecord;

/// Request body for registering a service.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterServiceRequest {
    /// Service name, unique across registered services
    pub name: String,
    /// Service kind, e.g. "Storage" or "Southbound"
    #[serde(rename = "type")]
    pub service_type: String,
    /// Host the service listens on
    pub address: String,
    /// Data-plane port, omitted for services without one
    #[serde(default)]
    pub service_port: Option<u16>,
    /// Management port
    pub management_port: u16,
    /// "http" or "https", defaults to "http"
    #[serde(default)]
    pub protocol: Option<String>,
}

/// Request body for registering a configuration interest.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterInterestRequest {
    /// Configuration category being watched
    pub category: String,
    /// Id of the subscribing service
    pub service: String,
}

/// Acknowledgement for register/unregister operations.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AckResponse {
    /// Id of the affected record
    pub id: String,
    /// Human-readable outcome
    pub message: String,
}

/// One registered service as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceResponse {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_port: Option<u16>,
    pub management_port: u16,
    pub protocol: String,
    pub status: String,
    pub registered_at: DateTime<Utc>,
}

impl From<&ServiceRecord> for ServiceResponse {
    fn from(record: &ServiceRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            service_type: record.service_type.to_string(),
            address: record.address.clone(),
            service_port: record.service_port,
            management_port: record.management_port,
            protocol: record.protocol.to_string(),
            status: record.status.to_string(),
            registered_at: record.registered_at,
        }
    }
}

/// Response body for service list/filter queries.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServicesListResponse {
    pub services: Vec<ServiceResponse>,
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PingResponse {
    /// Whole seconds since process start
    pub uptime: u64,
}

/// Query parameters for service list/filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListServicesQuery {
    /// Filter by exact name
    pub name: Option<String>,
    /// Filter by service type
    #[serde(rename = "type")]
    pub service_type: Option<String>,
}

/// JSON body extractor that rejects with a 400 validation error.
///
/// Axum's stock `Json` rejection carries a status of its own (415, 422);
/// this API reports every malformed body uniformly as a 400.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}
