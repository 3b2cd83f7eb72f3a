//! Periodic health monitor loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::monitor::events::{HealthEvent, HealthEventBroadcaster};
use crate::monitor::prober::HealthProbe;
use crate::registry::{ServiceRecord, ServiceRegistry, ServiceStatus};

/// Default seconds between probe cycles.
const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Default per-probe timeout in seconds.
const DEFAULT_PING_TIMEOUT_SECS: u64 = 2;

/// Default number of consecutive failures before a service is marked
/// unresponsive.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Configuration for the health monitor loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between probe cycles.
    pub interval: Duration,
    /// Upper bound on one probe, regardless of the probe implementation.
    pub ping_timeout: Duration,
    /// Consecutive failures required to mark a service unresponsive.
    pub max_attempts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            ping_timeout: Duration::from_secs(DEFAULT_PING_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Periodically probes every registered service and maintains its status.
///
/// The loop reads a registry snapshot each cycle and writes only status
/// fields, so it never contends with register/unregister beyond the map
/// lock. Consecutive-failure counts live here, not in the records; a count
/// for a record that has been removed is dropped on the next cycle.
pub struct HealthMonitor {
    inner: Arc<MonitorInner>,
    cancel_token: CancellationToken,
    handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

struct MonitorInner {
    registry: Arc<ServiceRegistry>,
    probe: Arc<dyn HealthProbe>,
    config: MonitorConfig,
    events: HealthEventBroadcaster,
    failures: DashMap<String, u32>,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        probe: Arc<dyn HealthProbe>,
        config: MonitorConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                registry,
                probe,
                config,
                events: HealthEventBroadcaster::new(),
                failures: DashMap::new(),
            }),
            cancel_token,
            handle: parking_lot::Mutex::new(None),
        }
    }

    /// Subscribe to status-transition events.
    pub fn events(&self) -> HealthEventBroadcaster {
        self.inner.events.clone()
    }

    /// Start the probe loop. Calling start twice replaces nothing; the
    /// second call is ignored.
    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            warn!("health monitor already started");
            return;
        }

        let inner = self.inner.clone();
        let cancel_token = self.cancel_token.clone();
        info!(
            interval_secs = inner.config.interval.as_secs(),
            max_attempts = inner.config.max_attempts,
            "health monitor started"
        );

        *handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.config.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        debug!("health monitor loop cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        inner.run_cycle().await;
                    }
                }
            }
        }));
    }

    /// Cancel the loop and wait briefly for it to wind down.
    pub async fn stop(&self) {
        self.cancel_token.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle
            && tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .is_err()
        {
            warn!("health monitor did not stop within 5s");
        }
        info!("health monitor stopped");
    }

    #[cfg(test)]
    async fn run_cycle(&self) {
        self.inner.run_cycle().await;
    }
}

impl MonitorInner {
    /// One probe pass over the current registry snapshot.
    ///
    /// Probe failures are logged and folded into the failure counts; they
    /// never escape this function, so one bad service cannot stop the loop.
    async fn run_cycle(&self) {
        let snapshot = self.registry.all();

        // Drop counters for records that no longer exist.
        self.failures
            .retain(|id, _| snapshot.iter().any(|record| &record.id == id));

        // Probes run concurrently; a slow service delays the cycle by at
        // most one ping timeout instead of stalling everything behind it.
        let checks = snapshot
            .iter()
            // Administratively stopped records are not probed.
            .filter(|record| record.status != ServiceStatus::Shutdown)
            .map(|record| async move {
                let outcome =
                    tokio::time::timeout(self.config.ping_timeout, self.probe.ping(record)).await;
                (record, outcome)
            });

        for (record, outcome) in join_all(checks).await {
            match outcome {
                Ok(Ok(())) => self.handle_success(record),
                Ok(Err(e)) => self.handle_failure(record, &e.to_string()),
                Err(_) => self.handle_failure(
                    record,
                    &format!("probe timed out after {:?}", self.config.ping_timeout),
                ),
            }
        }
    }

    fn handle_success(&self, record: &ServiceRecord) {
        self.failures.remove(&record.id);

        if record.status == ServiceStatus::Unresponsive {
            // No-op if the record vanished between snapshot and now.
            if self.registry.set_status(&record.id, ServiceStatus::Running) {
                info!(name = %record.name, id = %record.id, "service recovered");
                let _ = self.events.publish(HealthEvent::Recovered {
                    service_id: record.id.clone(),
                    service_name: record.name.clone(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    fn handle_failure(&self, record: &ServiceRecord, reason: &str) {
        let count = {
            let mut entry = self.failures.entry(record.id.clone()).or_insert(0);
            *entry += 1;
            *entry
        };

        warn!(
            name = %record.name,
            id = %record.id,
            consecutive = count,
            error = %reason,
            "health probe failed"
        );

        if count >= self.config.max_attempts {
            if record.status != ServiceStatus::Unresponsive
                && self
                    .registry
                    .set_status(&record.id, ServiceStatus::Unresponsive)
            {
                let _ = self.events.publish(HealthEvent::Unresponsive {
                    service_id: record.id.clone(),
                    service_name: record.name.clone(),
                    consecutive_failures: count,
                    timestamp: Utc::now(),
                });
            }
        } else {
            let _ = self.events.publish(HealthEvent::Degraded {
                service_id: record.id.clone(),
                service_name: record.name.clone(),
                consecutive_failures: count,
                timestamp: Utc::now(),
            });
        }
    }
}
