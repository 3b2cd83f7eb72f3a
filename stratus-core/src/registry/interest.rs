//! Interest registry: who wants to hear about which configuration category.
//!
//! This is a publish/subscribe directory, not a notification bus. Delivering
//! the actual configuration-change event to subscribers belongs to the
//! configuration manager; this registry only tracks the subscriptions and
//! keeps them unique per (service, category) pair.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::configuration::CategoryValidator;
use crate::error::{Error, Result};

/// One configuration-change subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestRecord {
    /// Unique identifier, generated at registration.
    pub id: String,
    /// Id of the subscribing service; a reference into the service
    /// registry's id space, not ownership.
    pub microservice_id: String,
    /// Configuration category the service wants change events for.
    pub category_name: String,
}

/// In-memory directory of configuration-change subscriptions.
pub struct InterestRegistry {
    interests: RwLock<HashMap<String, InterestRecord>>,
    validator: Arc<dyn CategoryValidator>,
}

impl InterestRegistry {
    pub fn new(validator: Arc<dyn CategoryValidator>) -> Self {
        Self {
            interests: RwLock::new(HashMap::new()),
            validator,
        }
    }

    /// Register an interest of `microservice_id` in `category_name`.
    ///
    /// The category name is validated through the configuration manager
    /// before anything is inserted. Duplicate (service, category) pairs are
    /// rejected; the uniqueness check and the insert share one critical
    /// section.
    pub async fn register(
        &self,
        microservice_id: &str,
        category_name: &str,
    ) -> Result<InterestRecord> {
        if microservice_id.trim().is_empty() {
            return Err(Error::validation("microservice id is required"));
        }
        self.validator.validate_category(category_name).await?;

        let record = InterestRecord {
            id: uuid::Uuid::new_v4().to_string(),
            microservice_id: microservice_id.to_string(),
            category_name: category_name.to_string(),
        };

        let mut interests = self.interests.write();
        let duplicate = interests.values().any(|existing| {
            existing.microservice_id == record.microservice_id
                && existing.category_name == record.category_name
        });
        if duplicate {
            return Err(Error::InterestAlreadyExists {
                microservice_id: record.microservice_id,
                category_name: record.category_name,
            });
        }
        interests.insert(record.id.clone(), record.clone());
        drop(interests);

        info!(
            id = %record.id,
            service_id = %record.microservice_id,
            category = %record.category_name,
            "interest registered"
        );
        Ok(record)
    }

    /// Remove one interest by id.
    pub fn unregister(&self, id: &str) -> Result<InterestRecord> {
        let removed = self
            .interests
            .write()
            .remove(id)
            .ok_or_else(|| Error::not_found("interest", id))?;

        info!(
            id = %removed.id,
            service_id = %removed.microservice_id,
            category = %removed.category_name,
            "interest unregistered"
        );
        Ok(removed)
    }

    /// Look up one interest by id.
    pub fn get(&self, id: &str) -> Result<InterestRecord> {
        self.interests
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("interest", id))
    }

    /// Snapshot of every registered interest.
    pub fn all(&self) -> Vec<InterestRecord> {
        self.interests.read().values().cloned().collect()
    }

    /// Filtered lookup by subscriber and/or category.
    ///
    /// Fails with a not-found error when the filters match nothing.
    pub fn find(
        &self,
        microservice_id: Option<&str>,
        category_name: Option<&str>,
    ) -> Result<Vec<InterestRecord>> {
        let matches: Vec<InterestRecord> = self
            .interests
            .read()
            .values()
            .filter(|record| microservice_id.is_none_or(|m| record.microservice_id == m))
            .filter(|record| category_name.is_none_or(|c| record.category_name == c))
            .cloned()
            .collect();

        if matches.is_empty() {
            return Err(Error::not_found("interest", "no matching interests"));
        }
        Ok(matches)
    }

    /// Drop every interest owned by one service; returns how many were
    /// removed. Used by the service registry's unregister cascade.
    pub fn remove_for_service(&self, microservice_id: &str) -> usize {
        let mut interests = self.interests.write();
        let before = interests.len();
        interests.retain(|_, record| record.microservice_id != microservice_id);
        before - interests.len()
    }

    pub fn len(&self) -> usize {
        self.interests.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.interests.read().is_empty()
    }
}
