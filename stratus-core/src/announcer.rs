//! Local-network service announcement.
//!
//! The core advertises its endpoints so that tooling on the same network can
//! find them without knowing addresses up front. The broadcast mechanics
//! (mDNS responder, DNS-SD records) belong to an external discovery agent;
//! this module only owns the per-endpoint announcement lifecycle and the
//! rule that announcement failures never take the platform down.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Service types we announce, DNS-SD style.
pub const CORE_SERVICE_TYPE: &str = "_stratus-core._tcp.local.";
pub const ADMIN_SERVICE_TYPE: &str = "_stratus-admin._tcp.local.";
pub const USER_SERVICE_TYPE: &str = "_stratus-user._tcp.local.";

/// One discovery record to broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advertisement {
    /// Instance name, unique per endpoint on this host.
    pub instance: String,
    /// Service type tag (one of the `*_SERVICE_TYPE` constants).
    pub service_type: String,
    /// Port the endpoint listens on.
    pub port: u16,
    /// Additional TXT records.
    pub txt: HashMap<String, String>,
}

impl Advertisement {
    pub fn new(instance: impl Into<String>, service_type: impl Into<String>, port: u16) -> Self {
        Self {
            instance: instance.into(),
            service_type: service_type.into(),
            port,
            txt: HashMap::new(),
        }
    }

    pub fn with_txt(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.txt.insert(key.into(), value.into());
        self
    }
}

/// Seam for the external discovery-broadcast mechanism.
#[async_trait]
pub trait DiscoveryBackend: Send + Sync {
    /// Begin broadcasting an advertisement.
    async fn publish(&self, advertisement: &Advertisement) -> Result<()>;

    /// Withdraw a previously published advertisement.
    async fn withdraw(&self, instance: &str) -> Result<()>;
}

/// Registers advertisements with a LAN discovery agent over HTTP.
///
/// The agent owns the actual responder; this backend only tells it what to
/// broadcast (`POST {agent}/announce`) and what to drop
/// (`DELETE {agent}/announce/{instance}`).
pub struct HttpDiscoveryBackend {
    agent_url: String,
    client: reqwest::Client,
}

impl HttpDiscoveryBackend {
    pub fn new(agent_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            agent_url: agent_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl DiscoveryBackend for HttpDiscoveryBackend {
    async fn publish(&self, advertisement: &Advertisement) -> Result<()> {
        let url = format!("{}/announce", self.agent_url);
        self.client
            .post(&url)
            .json(advertisement)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn withdraw(&self, instance: &str) -> Result<()> {
        let url = format!("{}/announce/{}", self.agent_url, instance);
        self.client.delete(&url).send().await?.error_for_status()?;
        Ok(())
    }
}

/// Backend used when discovery is disabled in configuration.
pub struct NoOpDiscoveryBackend;

#[async_trait]
impl DiscoveryBackend for NoOpDiscoveryBackend {
    async fn publish(&self, advertisement: &Advertisement) -> Result<()> {
        debug!(instance = %advertisement.instance, "discovery disabled, not announcing");
        Ok(())
    }

    async fn withdraw(&self, _instance: &str) -> Result<()> {
        Ok(())
    }
}

/// Owns the broadcast lifecycle of one endpoint's discovery record.
///
/// Several announcers coexist (management, admin API, user API), each
/// stopped individually during shutdown. Start and stop never fail: the
/// endpoint stays reachable whether or not its announcement went out.
pub struct ServiceAnnouncer {
    backend: Arc<dyn DiscoveryBackend>,
    advertisement: Advertisement,
    active: AtomicBool,
}

impl ServiceAnnouncer {
    pub fn new(backend: Arc<dyn DiscoveryBackend>, advertisement: Advertisement) -> Self {
        Self {
            backend,
            advertisement,
            active: AtomicBool::new(false),
        }
    }

    pub fn advertisement(&self) -> &Advertisement {
        &self.advertisement
    }

    /// Begin broadcasting. Failures are logged and swallowed.
    pub async fn start(&self) {
        if self.active.load(Ordering::SeqCst) {
            warn!(instance = %self.advertisement.instance, "announcer already started");
            return;
        }

        match self.backend.publish(&self.advertisement).await {
            Ok(()) => {
                self.active.store(true, Ordering::SeqCst);
                info!(
                    instance = %self.advertisement.instance,
                    service_type = %self.advertisement.service_type,
                    port = self.advertisement.port,
                    "announcing service"
                );
            }
            Err(e) => {
                warn!(
                    instance = %self.advertisement.instance,
                    error = %e,
                    "failed to announce service, endpoint stays reachable"
                );
            }
        }
    }

    /// Withdraw the advertisement if it was ever published.
    pub async fn stop(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Err(e) = self.backend.withdraw(&self.advertisement.instance).await {
            warn!(
                instance = %self.advertisement.instance,
                error = %e,
                "failed to withdraw announcement"
            );
        } else {
            info!(instance = %self.advertisement.instance, "announcement withdrawn");
        }
    }
}
