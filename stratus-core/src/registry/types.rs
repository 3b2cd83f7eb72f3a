//! Service registry record types.
//!
//! This module defines the lightweight record structure kept for every
//! registered microservice, together with its type, protocol and status
//! enums and their wire forms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of microservice a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "PascalCase", ascii_case_insensitive)]
#[serde(rename_all = "PascalCase")]
pub enum ServiceType {
    Core,
    Storage,
    Southbound,
    Northbound,
    Notification,
    Management,
}

/// Scheme used to reach a service's endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

/// Liveness status of a registered service.
///
/// Status is mutated only by the health monitor or by explicit
/// unregistration; registration always starts a record at `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[strum(serialize_all = "PascalCase", ascii_case_insensitive)]
#[serde(rename_all = "PascalCase")]
pub enum ServiceStatus {
    Running,
    Unresponsive,
    Shutdown,
}

/// In-memory record for one registered microservice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Unique identifier, generated at registration.
    pub id: String,
    /// Human-assigned name, unique across registered services.
    pub name: String,
    /// Service kind.
    pub service_type: ServiceType,
    /// Host the service is reachable on.
    pub address: String,
    /// Data-plane port, absent for services without one.
    pub service_port: Option<u16>,
    /// Lifecycle/control port, always present.
    pub management_port: u16,
    /// Scheme for both endpoints.
    pub protocol: Protocol,
    /// Current liveness status.
    pub status: ServiceStatus,
    /// When the record was created.
    pub registered_at: DateTime<Utc>,
}

impl ServiceRecord {
    pub fn new(
        name: impl Into<String>,
        service_type: ServiceType,
        address: impl Into<String>,
        service_port: Option<u16>,
        management_port: u16,
        protocol: Protocol,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            service_type,
            address: address.into(),
            service_port,
            management_port,
            protocol,
            status: ServiceStatus::Running,
            registered_at: Utc::now(),
        }
    }

    /// Base URL of the service's management endpoint.
    pub fn management_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.address, self.management_port)
    }

    /// Base URL of the data-plane endpoint, when the service has one.
    pub fn service_url(&self) -> Option<String> {
        self.service_port
            .map(|port| format!("{}://{}:{}", self.protocol, self.address, port))
    }
}
