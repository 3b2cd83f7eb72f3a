//! Ordered startup and shutdown of the core's components.
//!
//! The sequencer owns every long-lived component and walks them through a
//! fixed stage order. Later stages depend on earlier ones (the management
//! port feeds the storage launch, the scheduler callback, and the core's
//! own registration), so startup is strictly sequential. Shutdown runs
//! the stages in reverse, logging failures and always continuing to the
//! next stage.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::announcer::{
    ADMIN_SERVICE_TYPE, Advertisement, CORE_SERVICE_TYPE, DiscoveryBackend, ServiceAnnouncer,
    USER_SERVICE_TYPE,
};
use crate::api::{ApiServer, ApiServerConfig, AppState, BoundApi};
use crate::config::CoreConfig;
use crate::configuration::ConfigurationManager;
use crate::error::{Error, Result};
use crate::monitor::{HealthMonitor, HealthProbe};
use crate::registry::{InterestRegistry, Protocol, ServiceRegistry, ServiceStatus, ServiceType};
use crate::scheduler::SchedulerEngine;
use crate::storage::{RetryPolicy, StorageClient, StorageSpawner};

/// Name the core registers itself under.
pub const CORE_SERVICE_NAME: &str = "Stratus Core";

/// Lifecycle stage of the core process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum BootstrapStage {
    Init,
    ManagementApiUp,
    StorageLaunching,
    StorageClientBound,
    ConfigAndInterestReady,
    SchedulerUp,
    MonitorUp,
    PublicApiUp,
    Announced,
    CoreRegistered,
    Running,
    ShuttingDown,
    Stopped,
}

/// Components brought up so far. Fields are filled in stage order, so a
/// failed startup leaves exactly the started subset for rollback.
#[derive(Default)]
struct RunningCore {
    management_server: Option<ApiServer>,
    management: Option<BoundApi>,
    public_server: Option<ApiServer>,
    public: Option<BoundApi>,
    monitor: Option<HealthMonitor>,
    scheduler_running: bool,
    announcers: Vec<ServiceAnnouncer>,
    storage: Option<Arc<StorageClient>>,
    core_record_id: Option<String>,
    events_cancel: CancellationToken,
    events_task: Option<JoinHandle<()>>,
}

/// Owner and orchestrator of the core's components.
pub struct BootstrapSequencer {
    config: CoreConfig,
    registry: Arc<ServiceRegistry>,
    state: AppState,
    spawner: Arc<dyn StorageSpawner>,
    probe: Arc<dyn HealthProbe>,
    discovery: Arc<dyn DiscoveryBackend>,
    scheduler: Arc<dyn SchedulerEngine>,
    retry_policy: RetryPolicy,
    stage: RwLock<BootstrapStage>,
    running: Mutex<Option<RunningCore>>,
}

impl BootstrapSequencer {
    /// Create a sequencer with a fresh registry.
    pub fn new(
        config: CoreConfig,
        spawner: Arc<dyn StorageSpawner>,
        probe: Arc<dyn HealthProbe>,
        discovery: Arc<dyn DiscoveryBackend>,
        scheduler: Arc<dyn SchedulerEngine>,
    ) -> Self {
        let registry = Arc::new(ServiceRegistry::new());
        let state = AppState::new(registry.clone());
        let retry_policy = config.storage_retry_policy();
        Self {
            config,
            registry,
            state,
            spawner,
            probe,
            discovery,
            scheduler,
            retry_policy,
            stage: RwLock::new(BootstrapStage::Init),
            running: Mutex::new(None),
        }
    }

    /// Override the storage readiness retry policy.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// The shared service registry.
    pub fn registry(&self) -> Arc<ServiceRegistry> {
        self.registry.clone()
    }

    /// The shared API handler state.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Current lifecycle stage.
    pub fn stage(&self) -> BootstrapStage {
        *self.stage.read()
    }

    /// Bound address of the management listener, once up.
    pub fn management_addr(&self) -> Option<SocketAddr> {
        let running = self.running.lock();
        running
            .as_ref()
            .and_then(|r| r.management.as_ref())
            .map(|b| b.local_addr())
    }

    /// Bound address of the public listener, once up.
    pub fn public_addr(&self) -> Option<SocketAddr> {
        let running = self.running.lock();
        running
            .as_ref()
            .and_then(|r| r.public.as_ref())
            .map(|b| b.local_addr())
    }

    fn advance(&self, stage: BootstrapStage) {
        *self.stage.write() = stage;
        tracing::info!(stage = %stage, "Bootstrap stage reached");
    }

    /// Bring every component up, in order.
    ///
    /// On failure the already-started components are shut down in reverse
    /// before the error is returned; the caller is expected to exit
    /// non-zero.
    pub async fn start(&self) -> Result<()> {
        let mut running = RunningCore::default();
        match self.try_start(&mut running).await {
            Ok(()) => {
                *self.running.lock() = Some(running);
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    stage = %self.stage(),
                    error = %e,
                    "Bootstrap failed, rolling back started components"
                );
                self.run_shutdown(running).await;
                Err(e)
            }
        }
    }

    async fn try_start(&self, running: &mut RunningCore) -> Result<()> {
        tracing::info!("Starting core bootstrap");

        // Management surface first; every later stage needs its port.
        let management_server = ApiServer::management(
            ApiServerConfig::management(&self.config),
            self.state.clone(),
        );
        let management = management_server.bind().await?;
        let management_port = management.local_addr().port();
        running.management_server = Some(management_server);
        running.management = Some(management);
        self.advance(BootstrapStage::ManagementApiUp);

        if self.config.spawn_storage {
            self.spawner
                .spawn(&self.config.host, management_port)
                .await?;
        } else {
            tracing::info!("Storage spawn disabled, expecting an externally managed instance");
        }
        self.advance(BootstrapStage::StorageLaunching);

        let storage = Arc::new(self.wait_for_storage().await?);
        running.storage = Some(storage.clone());
        self.advance(BootstrapStage::StorageClientBound);

        let configuration = Arc::new(ConfigurationManager::new(storage));
        let interests = Arc::new(InterestRegistry::new(configuration));
        self.registry.link_interest_registry(interests.clone());
        self.state.bind_interests(interests);
        self.advance(BootstrapStage::ConfigAndInterestReady);

        self.scheduler
            .start(&self.config.host, management_port)
            .await?;
        running.scheduler_running = true;
        self.advance(BootstrapStage::SchedulerUp);

        let monitor = HealthMonitor::new(
            self.registry.clone(),
            self.probe.clone(),
            self.config.monitor_config(),
            CancellationToken::new(),
        );
        running.events_task =
            Some(Self::spawn_event_logger(&monitor, running.events_cancel.clone()));
        monitor.start();
        running.monitor = Some(monitor);
        self.advance(BootstrapStage::MonitorUp);

        let public_server =
            ApiServer::public(ApiServerConfig::public(&self.config), self.state.clone());
        let public = public_server.bind().await?;
        let public_port = public.local_addr().port();
        running.public_server = Some(public_server);
        running.public = Some(public);
        self.advance(BootstrapStage::PublicApiUp);

        for advertisement in [
            Advertisement::new(CORE_SERVICE_NAME, CORE_SERVICE_TYPE, management_port),
            Advertisement::new("Stratus Core Admin", ADMIN_SERVICE_TYPE, public_port),
            Advertisement::new("Stratus Core User", USER_SERVICE_TYPE, public_port),
        ] {
            let advertisement = advertisement.with_txt("version", env!("CARGO_PKG_VERSION"));
            let announcer = ServiceAnnouncer::new(self.discovery.clone(), advertisement);
            announcer.start().await;
            running.announcers.push(announcer);
        }
        self.advance(BootstrapStage::Announced);

        let record = self.registry.register(
            CORE_SERVICE_NAME,
            ServiceType::Core,
            &self.config.host,
            Some(public_port),
            management_port,
            Protocol::Http,
        )?;
        running.core_record_id = Some(record.id);
        self.advance(BootstrapStage::CoreRegistered);

        self.advance(BootstrapStage::Running);
        tracing::info!(management_port, public_port, "Core bootstrap complete");
        Ok(())
    }

    /// Wait until a storage service is registered and answers pings.
    ///
    /// Retries under the configured policy; with the default unbounded
    /// policy this blocks for as long as it takes.
    async fn wait_for_storage(&self) -> Result<StorageClient> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.storage_candidate() {
                Ok(client) => match client.ping().await {
                    Ok(()) => {
                        tracing::info!(
                            attempt,
                            service_id = client.service_id(),
                            "Storage service is ready"
                        );
                        return Ok(client);
                    }
                    Err(e) => {
                        tracing::info!(attempt, error = %e, "Storage service not answering yet")
                    }
                },
                Err(e) => tracing::info!(attempt, error = %e, "Storage service not registered yet"),
            }

            if !self.retry_policy.should_retry(attempt) {
                return Err(Error::dependency_unavailable(format!(
                    "storage service did not become ready after {attempt} attempts"
                )));
            }
            tokio::time::sleep(self.retry_policy.delay()).await;
        }
    }

    fn storage_candidate(&self) -> Result<StorageClient> {
        let records = self.registry.find(None, Some(ServiceType::Storage))?;
        let record = records
            .first()
            .ok_or_else(|| Error::dependency_unavailable("no storage service registered"))?;
        StorageClient::from_record(record)
    }

    fn spawn_event_logger(monitor: &HealthMonitor, cancel: CancellationToken) -> JoinHandle<()> {
        let mut receiver = monitor.events().subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Health event logger shutting down");
                        break;
                    }
                    result = receiver.recv() => {
                        match result {
                            Ok(event) => {
                                if event.should_alert() {
                                    tracing::warn!("{}", event.description());
                                } else {
                                    tracing::debug!("{}", event.description());
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(missed)) => {
                                tracing::warn!(missed, "Health event logger lagged");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            }
        })
    }

    /// Stop everything that is running, in reverse start order.
    pub async fn shutdown(&self) {
        let running = self.running.lock().take();
        let Some(running) = running else {
            tracing::debug!("Shutdown requested but nothing is running");
            return;
        };
        self.run_shutdown(running).await;
    }

    async fn run_shutdown(&self, running: RunningCore) {
        self.advance(BootstrapStage::ShuttingDown);
        let grace = self.config.shutdown_grace();

        if let Some(id) = &running.core_record_id {
            self.registry.set_status(id, ServiceStatus::Shutdown);
        }

        for announcer in &running.announcers {
            announcer.stop().await;
        }

        if let Some(server) = &running.public_server {
            server.shutdown();
        }
        if let Some(bound) = running.public {
            bound.join(grace).await;
        }

        if running.scheduler_running {
            match tokio::time::timeout(grace, self.scheduler.stop()).await {
                Ok(Ok(())) => tracing::info!("Scheduler stopped"),
                Ok(Err(e)) => tracing::error!(error = %e, "Scheduler stop failed"),
                Err(_) => {
                    let e = Error::ShutdownTimeout {
                        stage: "scheduler".to_string(),
                        timeout_secs: grace.as_secs(),
                    };
                    tracing::error!(error = %e, "Scheduler stop abandoned");
                }
            }
        }

        if let Some(monitor) = &running.monitor {
            monitor.stop().await;
        }

        if let Some(storage) = &running.storage {
            if let Err(e) = storage.shutdown().await {
                tracing::warn!(error = %e, "Storage shutdown request failed");
            }
        }
        self.spawner.finalize(grace).await;

        if let Some(server) = &running.management_server {
            server.shutdown();
        }
        if let Some(bound) = running.management {
            bound.join(grace).await;
        }

        running.events_cancel.cancel();
        if let Some(task) = running.events_task {
            let _ = tokio::time::timeout(Duration::from_secs(1), task).await;
        }

        self.advance(BootstrapStage::Stopped);
        tracing::info!("Core stopped");
    }
}

#[cfg(test)]
mod sequencer_tests {
    use super::*;
    use crate::announcer::NoOpDiscoveryBackend;
    use crate::monitor::HttpHealthProbe;
    use axum::{Json, Router, routing::get, routing::post};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::net::TcpListener;

    #[derive(Default)]
    struct RecordingSpawner {
        called: Mutex<Option<(String, u16)>>,
    }

    #[async_trait::async_trait]
    impl StorageSpawner for RecordingSpawner {
        async fn spawn(&self, core_address: &str, core_management_port: u16) -> Result<()> {
            *self.called.lock() = Some((core_address.to_string(), core_management_port));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingScheduler {
        started: AtomicBool,
        stopped: AtomicBool,
    }

    #[async_trait::async_trait]
    impl SchedulerEngine for RecordingScheduler {
        async fn start(&self, _core_address: &str, _core_management_port: u16) -> Result<()> {
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> Result<()> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingScheduler;

    #[async_trait::async_trait]
    impl SchedulerEngine for FailingScheduler {
        async fn start(&self, _core_address: &str, _core_management_port: u16) -> Result<()> {
            Err(Error::Other("scheduler refused to start".to_string()))
        }

        async fn stop(&self) -> Result<()> {
            Ok(())
        }
    }

    async fn spawn_fake_storage() -> (SocketAddr, JoinHandle<()>) {
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .route(
                "/service/shutdown",
                post(|| async { Json(serde_json::json!({"message": "shutting down"})) }),
            );
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake storage");
        let addr = listener.local_addr().expect("fake storage addr");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (addr, handle)
    }

    fn local_config() -> CoreConfig {
        CoreConfig {
            host: "127.0.0.1".to_string(),
            management_bind: "127.0.0.1".to_string(),
            management_port: 0,
            api_bind: "127.0.0.1".to_string(),
            api_port: 0,
            storage_retry_secs: 1,
            shutdown_timeout_secs: 5,
            ..CoreConfig::default()
        }
    }

    fn register_fake_storage(sequencer: &BootstrapSequencer, port: u16) {
        sequencer
            .registry()
            .register(
                "Stratus Storage",
                ServiceType::Storage,
                "127.0.0.1",
                None,
                port,
                Protocol::Http,
            )
            .expect("storage registration");
    }

    #[tokio::test]
    async fn bootstrap_reaches_running_and_stops_clean() {
        let (storage_addr, storage_task) = spawn_fake_storage().await;
        let spawner = Arc::new(RecordingSpawner::default());
        let scheduler = Arc::new(RecordingScheduler::default());

        let sequencer = BootstrapSequencer::new(
            local_config(),
            spawner.clone(),
            Arc::new(HttpHealthProbe::new(Duration::from_secs(1))),
            Arc::new(NoOpDiscoveryBackend),
            scheduler.clone(),
        );
        register_fake_storage(&sequencer, storage_addr.port());

        sequencer.start().await.expect("bootstrap should complete");
        assert_eq!(sequencer.stage(), BootstrapStage::Running);
        assert!(scheduler.started.load(Ordering::SeqCst));
        assert!(sequencer.state().interests().is_some());

        let management_port = sequencer
            .management_addr()
            .expect("management listener bound")
            .port();
        let spawn_args = spawner.called.lock().clone();
        assert_eq!(
            spawn_args,
            Some(("127.0.0.1".to_string(), management_port))
        );

        let cores = sequencer
            .registry()
            .find(None, Some(ServiceType::Core))
            .expect("core registered itself");
        assert_eq!(cores.len(), 1);
        assert_eq!(cores[0].name, CORE_SERVICE_NAME);

        sequencer.shutdown().await;
        assert_eq!(sequencer.stage(), BootstrapStage::Stopped);
        assert!(scheduler.stopped.load(Ordering::SeqCst));
        storage_task.abort();
    }

    #[tokio::test]
    async fn scheduler_failure_rolls_back_to_stopped() {
        let (storage_addr, storage_task) = spawn_fake_storage().await;
        let sequencer = BootstrapSequencer::new(
            local_config(),
            Arc::new(RecordingSpawner::default()),
            Arc::new(HttpHealthProbe::new(Duration::from_secs(1))),
            Arc::new(NoOpDiscoveryBackend),
            Arc::new(FailingScheduler),
        );
        register_fake_storage(&sequencer, storage_addr.port());

        let result = sequencer.start().await;
        assert!(result.is_err());
        assert_eq!(sequencer.stage(), BootstrapStage::Stopped);
        storage_task.abort();
    }

    #[tokio::test]
    async fn missing_storage_exhausts_bounded_retry() {
        let mut config = local_config();
        config.spawn_storage = false;

        let sequencer = BootstrapSequencer::new(
            config,
            Arc::new(RecordingSpawner::default()),
            Arc::new(HttpHealthProbe::new(Duration::from_secs(1))),
            Arc::new(NoOpDiscoveryBackend),
            Arc::new(RecordingScheduler::default()),
        )
        .with_retry_policy(RetryPolicy::fixed(Duration::from_millis(10)).with_max_attempts(2));

        let result = sequencer.start().await;
        assert!(matches!(result, Err(Error::DependencyUnavailable(_))));
        assert_eq!(sequencer.stage(), BootstrapStage::Stopped);
    }

    #[tokio::test]
    async fn shutdown_without_start_is_a_noop() {
        let sequencer = BootstrapSequencer::new(
            local_config(),
            Arc::new(RecordingSpawner::default()),
            Arc::new(HttpHealthProbe::new(Duration::from_secs(1))),
            Arc::new(NoOpDiscoveryBackend),
            Arc::new(RecordingScheduler::default()),
        );
        sequencer.shutdown().await;
        assert_eq!(sequencer.stage(), BootstrapStage::Init);
    }
}
