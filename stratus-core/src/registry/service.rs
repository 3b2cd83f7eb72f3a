//! In-memory service registry.
//!
//! The registry is the single source of truth for which microservices are
//! currently part of the running platform. Registration enforces three
//! uniqueness constraints (name, address + service port, address +
//! management port) atomically: the checks and the insert happen inside one
//! synchronous critical section, so concurrent registrations cannot both
//! pass the same check.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::registry::interest::InterestRegistry;
use crate::registry::types::{Protocol, ServiceRecord, ServiceStatus, ServiceType};

/// In-memory directory of running microservices.
///
/// All mutation goes through the narrow operation set below; no component
/// reaches into the table directly. Methods are synchronous on purpose:
/// holding the table lock never spans an await point.
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, ServiceRecord>>,
    /// Cascade link, wired once the interest registry exists (it is
    /// constructed later in the bootstrap sequence than this registry).
    interests: OnceLock<Arc<InterestRegistry>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            interests: OnceLock::new(),
        }
    }

    /// Wire the interest registry used for cascade removal on unregister.
    ///
    /// Called once during bootstrap; a second call is ignored with a warning.
    pub fn link_interest_registry(&self, interests: Arc<InterestRegistry>) {
        if self.interests.set(interests).is_err() {
            warn!("interest registry already linked, ignoring");
        }
    }

    /// Register a new service.
    ///
    /// Validates the submitted fields, then checks the three uniqueness
    /// constraints in a fixed order (name, address + service port, address +
    /// management port), each violation reported as its own error kind. The
    /// new record starts in `Running` status.
    pub fn register(
        &self,
        name: &str,
        service_type: ServiceType,
        address: &str,
        service_port: Option<u16>,
        management_port: u16,
        protocol: Protocol,
    ) -> Result<ServiceRecord> {
        if name.trim().is_empty() {
            return Err(Error::validation("service name is required"));
        }
        if address.trim().is_empty() {
            return Err(Error::validation("service address is required"));
        }
        if management_port == 0 {
            return Err(Error::validation("management port must be a positive integer"));
        }
        if service_port == Some(0) {
            return Err(Error::validation("service port must be a positive integer"));
        }

        let record = ServiceRecord::new(
            name,
            service_type,
            address,
            service_port,
            management_port,
            protocol,
        );

        // Check-then-insert is one critical section; nothing below awaits.
        let mut services = self.services.write();

        for existing in services.values() {
            if existing.name == record.name {
                return Err(Error::AlreadyExistsByName { name: record.name });
            }
        }
        if let Some(port) = record.service_port {
            for existing in services.values() {
                if existing.address == record.address && existing.service_port == Some(port) {
                    return Err(Error::AlreadyExistsByAddressAndServicePort {
                        address: record.address,
                        port,
                    });
                }
            }
        }
        for existing in services.values() {
            if existing.address == record.address
                && existing.management_port == record.management_port
            {
                return Err(Error::AlreadyExistsByAddressAndManagementPort {
                    address: record.address,
                    port: record.management_port,
                });
            }
        }

        services.insert(record.id.clone(), record.clone());
        drop(services);

        info!(
            name = %record.name,
            id = %record.id,
            service_type = %record.service_type,
            address = %record.address,
            management_port = record.management_port,
            "service registered"
        );
        Ok(record)
    }

    /// Remove a service and cascade removal of its interests.
    pub fn unregister(&self, id: &str) -> Result<ServiceRecord> {
        let removed = self
            .services
            .write()
            .remove(id)
            .ok_or_else(|| Error::not_found("service", id))?;

        if let Some(interests) = self.interests.get() {
            let dropped = interests.remove_for_service(id);
            if dropped > 0 {
                debug!(service_id = %id, count = dropped, "cascaded interest removal");
            }
        }

        info!(name = %removed.name, id = %removed.id, "service unregistered");
        Ok(removed)
    }

    /// Look up one service by id.
    pub fn get(&self, id: &str) -> Result<ServiceRecord> {
        self.services
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("service", id))
    }

    /// Snapshot of every registered service.
    pub fn all(&self) -> Vec<ServiceRecord> {
        self.services.read().values().cloned().collect()
    }

    /// Filtered lookup by name and/or type.
    ///
    /// Fails with a not-found error when the filters match nothing, so
    /// callers polling for a dependency can distinguish "not yet" cheaply.
    pub fn find(
        &self,
        name: Option<&str>,
        service_type: Option<ServiceType>,
    ) -> Result<Vec<ServiceRecord>> {
        let matches: Vec<ServiceRecord> = self
            .services
            .read()
            .values()
            .filter(|record| name.is_none_or(|n| record.name == n))
            .filter(|record| service_type.is_none_or(|t| record.service_type == t))
            .cloned()
            .collect();

        if matches.is_empty() {
            let mut filter = String::new();
            if let Some(n) = name {
                filter.push_str(&format!("name={n} "));
            }
            if let Some(t) = service_type {
                filter.push_str(&format!("type={t}"));
            }
            return Err(Error::not_found("service", filter.trim()));
        }
        Ok(matches)
    }

    /// Update the status field of an existing record.
    ///
    /// Returns false (and does nothing) if the record was concurrently
    /// removed; callers treat that as a harmless no-op.
    pub fn set_status(&self, id: &str, status: ServiceStatus) -> bool {
        let mut services = self.services.write();
        match services.get_mut(id) {
            Some(record) => {
                if record.status != status {
                    debug!(name = %record.name, id = %id, from = %record.status, to = %status, "service status changed");
                    record.status = status;
                }
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.read().is_empty()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
