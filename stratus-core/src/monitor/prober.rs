//! Liveness probes against service management endpoints.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::registry::ServiceRecord;

/// Seam for issuing a liveness probe to one service.
///
/// Abstracting the probe keeps the monitor loop testable without sockets and
/// leaves room for transport-specific probes later.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe the service's management endpoint; Ok means alive.
    async fn ping(&self, record: &ServiceRecord) -> Result<()>;
}

/// Probes `GET {management endpoint}/ping` over HTTP.
pub struct HttpHealthProbe {
    client: reqwest::Client,
}

impl HttpHealthProbe {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn ping(&self, record: &ServiceRecord) -> Result<()> {
        let url = format!("{}/ping", record.management_url());
        self.client.get(&url).send().await?.error_for_status()?;
        Ok(())
    }
}
