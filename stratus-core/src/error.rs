//! Application-wide error types.

use thiserror::Error;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A service with name {name} already exists")]
    AlreadyExistsByName { name: String },

    #[error("A service is already registered at {address}:{port} (service port)")]
    AlreadyExistsByAddressAndServicePort { address: String, port: u16 },

    #[error("A service is already registered at {address}:{port} (management port)")]
    AlreadyExistsByAddressAndManagementPort { address: String, port: u16 },

    #[error("An interest in category {category_name} already exists for service {microservice_id}")]
    InterestAlreadyExists {
        microservice_id: String,
        category_name: String,
    },

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("{stage} did not stop within {timeout_secs}s")]
    ShutdownTimeout { stage: String, timeout_secs: u64 },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn dependency_unavailable(msg: impl Into<String>) -> Self {
        Self::DependencyUnavailable(msg.into())
    }
}
