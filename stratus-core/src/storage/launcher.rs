//! Storage process launcher.
//!
//! The storage service is spawned as an independent OS-level child. The core
//! hands it its own address and management port so the child can register
//! itself back, then proceeds without waiting. Termination is requested over
//! the child's management endpoint, never by signal; the child handle is
//! kept only so shutdown can reap the exit status.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::error::Result;

/// Seam for launching the storage process.
#[async_trait]
pub trait StorageSpawner: Send + Sync {
    /// Spawn the storage service, passing the core's registration endpoint.
    async fn spawn(&self, core_address: &str, core_management_port: u16) -> Result<()>;

    /// Give the child a bounded chance to exit after it has been asked to
    /// shut down over HTTP. Implementations without a child do nothing.
    async fn finalize(&self, _grace: Duration) {}
}

/// Spawns the storage binary as a detached child process.
pub struct ProcessSpawner {
    binary: PathBuf,
    child: Mutex<Option<Child>>,
}

impl ProcessSpawner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            child: Mutex::new(None),
        }
    }
}

#[async_trait]
impl StorageSpawner for ProcessSpawner {
    async fn spawn(&self, core_address: &str, core_management_port: u16) -> Result<()> {
        let child = Command::new(&self.binary)
            .arg(format!("--address={core_address}"))
            .arg(format!("--port={core_management_port}"))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(false)
            .spawn()?;

        info!(
            binary = %self.binary.display(),
            pid = child.id(),
            core_address = %core_address,
            core_management_port = core_management_port,
            "storage process launched"
        );
        *self.child.lock() = Some(child);
        Ok(())
    }

    async fn finalize(&self, grace: Duration) {
        let child = self.child.lock().take();
        let Some(mut child) = child else {
            return;
        };

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => info!(status = %status, "storage process exited"),
            Ok(Err(e)) => warn!(error = %e, "failed to reap storage process"),
            Err(_) => warn!(
                grace_secs = grace.as_secs(),
                "storage process still running after grace period, leaving it be"
            ),
        }
    }
}
