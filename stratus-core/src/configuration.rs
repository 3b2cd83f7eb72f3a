//! Configuration-manager collaborator.
//!
//! Configuration values persist behind the storage service and change events
//! are delivered by the configuration manager itself; neither concern lives
//! in this crate. What the coordination core needs from the collaborator is
//! narrow: validating category names before an interest is recorded.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::storage::StorageClient;

/// Category-name validation seam used by the interest registry.
#[async_trait]
pub trait CategoryValidator: Send + Sync {
    async fn validate_category(&self, name: &str) -> Result<()>;
}

/// Configuration manager bound to the storage service.
///
/// Categories are created on first write by the storage side, so any
/// non-blank name is subscribable; existence is deliberately not checked.
pub struct ConfigurationManager {
    storage: Arc<StorageClient>,
}

impl ConfigurationManager {
    pub fn new(storage: Arc<StorageClient>) -> Self {
        Self { storage }
    }

    /// Client for the storage backend that holds configuration values.
    pub fn storage_client(&self) -> &Arc<StorageClient> {
        &self.storage
    }
}

#[async_trait]
impl CategoryValidator for ConfigurationManager {
    async fn validate_category(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::validation("category name is required"));
        }
        Ok(())
    }
}
