//! Scheduler engine seam.
//!
//! The task-execution engine (schedules, task processes, purge rules) is a
//! separate subsystem; the coordination core only starts it, hands it the
//! management endpoint scheduled tasks call back into, and stops it with a
//! bounded wait during shutdown.

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

/// Lifecycle seam for the scheduler engine.
#[async_trait]
pub trait SchedulerEngine: Send + Sync {
    /// Start the engine. `core_address`/`core_management_port` is the
    /// endpoint scheduled tasks use to register and report back.
    async fn start(&self, core_address: &str, core_management_port: u16) -> Result<()>;

    /// Stop the engine and wait for in-flight work to settle.
    async fn stop(&self) -> Result<()>;
}

/// Engine used when no scheduler is wired in; start and stop are accepted
/// and logged so the core runs standalone.
pub struct NoOpScheduler;

#[async_trait]
impl SchedulerEngine for NoOpScheduler {
    async fn start(&self, core_address: &str, core_management_port: u16) -> Result<()> {
        info!(
            core_address = %core_address,
            core_management_port = core_management_port,
            "no scheduler engine configured"
        );
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}
