//! HTTP client for the storage service's management endpoint.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::registry::{ServiceRecord, ServiceType};

/// Request timeout for storage management calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client bound to one storage service's management endpoint.
///
/// Construction is cheap and performs no I/O; the caller decides when the
/// first `ping` happens (the bootstrap sequencer pings right after binding
/// and treats a failure as "storage not ready yet").
#[derive(Debug, Clone)]
pub struct StorageClient {
    service_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl StorageClient {
    /// Bind a client to a registered storage service.
    pub fn from_record(record: &ServiceRecord) -> Result<Self> {
        if record.service_type != ServiceType::Storage {
            return Err(Error::validation(format!(
                "cannot bind a storage client to a {} service",
                record.service_type
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            service_id: record.id.clone(),
            base_url: record.management_url(),
            client,
        })
    }

    /// Id of the service record this client was bound from.
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Base URL of the storage management endpoint.
    pub fn management_url(&self) -> &str {
        &self.base_url
    }

    /// Liveness check against the storage management endpoint.
    pub async fn ping(&self) -> Result<()> {
        let url = format!("{}/ping", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::dependency_unavailable(format!("storage ping failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::dependency_unavailable(format!(
                "storage ping returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// Ask the storage process to shut itself down.
    ///
    /// Best effort: a non-2xx answer is reported as an error for the caller
    /// to log, never retried.
    pub async fn shutdown(&self) -> Result<()> {
        let url = format!("{}/service/shutdown", self.base_url);
        let response = self.client.post(&url).send().await?;

        let status = response.status();
        if status.is_success() {
            info!(url = %url, "storage service accepted shutdown request");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = %status, body = %body, "storage shutdown request rejected");
            Err(Error::Other(format!(
                "storage shutdown returned {status}"
            )))
        }
    }
}
