//! Health monitoring of registered services.
//!
//! A periodic loop probes every registered service's management endpoint
//! and flips the record's status between `Running` and `Unresponsive` based
//! on consecutive probe failures. The monitor only ever writes status; it
//! never removes a record.

pub mod events;
pub mod prober;
pub mod service;

pub use events::{HealthEvent, HealthEventBroadcaster};
pub use prober::{HealthProbe, HttpHealthProbe};
pub use service::{HealthMonitor, MonitorConfig};
