//! Service and interest registries.
//!
//! This module provides the in-memory directories at the heart of the
//! coordination core: which microservices are currently running, and which
//! of them want to hear about configuration-category changes.

pub mod interest;
pub mod service;
pub mod types;

pub use interest::{InterestRecord, InterestRegistry};
pub use service::ServiceRegistry;
pub use types::{Protocol, ServiceRecord, ServiceStatus, ServiceType};
