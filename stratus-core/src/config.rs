//! Runtime configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::monitor::MonitorConfig;
use crate::storage::RetryPolicy;

/// Configuration for the core service.
///
/// Every field has a default so the binary starts with no environment at
/// all. `STRATUS_*` variables override individual fields; values that fail
/// to parse are logged and ignored.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Address other services use to reach the core. This is what gets
    /// written into the core's own registry record and passed to the
    /// storage service on its command line.
    pub host: String,
    /// Bind address for the management API.
    pub management_bind: String,
    /// Management API port. 0 asks the OS for an ephemeral port.
    pub management_port: u16,
    /// Bind address for the public API.
    pub api_bind: String,
    /// Public API port.
    pub api_port: u16,
    /// Storage service binary, resolved through PATH when not absolute.
    pub storage_binary: PathBuf,
    /// Whether the core spawns the storage service itself. Disable when an
    /// externally managed storage instance registers on its own.
    pub spawn_storage: bool,
    /// Seconds between health check rounds.
    pub monitor_interval_secs: u64,
    /// Per-ping timeout in seconds for health checks.
    pub monitor_timeout_secs: u64,
    /// Consecutive ping failures before a service is marked unresponsive.
    pub monitor_max_attempts: u32,
    /// Seconds between storage readiness probes during startup.
    pub storage_retry_secs: u64,
    /// Grace period in seconds applied to each shutdown stage.
    pub shutdown_timeout_secs: u64,
    /// Discovery agent endpoint. Announcements are disabled when unset.
    pub discovery_agent: Option<String>,
    /// Directory for rolling log files. Logs go to stdout only when unset.
    pub log_dir: Option<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            management_bind: "0.0.0.0".to_string(),
            management_port: 0,
            api_bind: "0.0.0.0".to_string(),
            api_port: 8081,
            storage_binary: PathBuf::from("stratus-storage"),
            spawn_storage: true,
            monitor_interval_secs: 5,
            monitor_timeout_secs: 2,
            monitor_max_attempts: 3,
            storage_retry_secs: 5,
            shutdown_timeout_secs: 60,
            discovery_agent: None,
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("STRATUS_HOST")
            && !host.trim().is_empty()
        {
            config.host = host;
        }

        if let Ok(bind) = std::env::var("STRATUS_MANAGEMENT_BIND")
            && !bind.trim().is_empty()
        {
            config.management_bind = bind;
        }

        if let Ok(port) = std::env::var("STRATUS_MANAGEMENT_PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                config.management_port = parsed;
            } else {
                tracing::warn!(
                    value = %port,
                    "Invalid STRATUS_MANAGEMENT_PORT, using default"
                );
            }
        }

        if let Ok(bind) = std::env::var("STRATUS_API_BIND")
            && !bind.trim().is_empty()
        {
            config.api_bind = bind;
        }

        if let Ok(port) = std::env::var("STRATUS_API_PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                config.api_port = parsed;
            } else {
                tracing::warn!(value = %port, "Invalid STRATUS_API_PORT, using default");
            }
        }

        if let Ok(binary) = std::env::var("STRATUS_STORAGE_BIN")
            && !binary.trim().is_empty()
        {
            config.storage_binary = PathBuf::from(binary);
        }

        if let Ok(spawn) = std::env::var("STRATUS_STORAGE_SPAWN") {
            if let Ok(parsed) = spawn.parse::<bool>() {
                config.spawn_storage = parsed;
            } else {
                tracing::warn!(
                    value = %spawn,
                    "Invalid STRATUS_STORAGE_SPAWN, using default"
                );
            }
        }

        if let Ok(interval) = std::env::var("STRATUS_MONITOR_INTERVAL_SECS") {
            if let Ok(parsed) = interval.parse::<u64>()
                && parsed > 0
            {
                config.monitor_interval_secs = parsed;
            } else {
                tracing::warn!(
                    value = %interval,
                    "Invalid STRATUS_MONITOR_INTERVAL_SECS, using default"
                );
            }
        }

        if let Ok(timeout) = std::env::var("STRATUS_MONITOR_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>()
                && parsed > 0
            {
                config.monitor_timeout_secs = parsed;
            } else {
                tracing::warn!(
                    value = %timeout,
                    "Invalid STRATUS_MONITOR_TIMEOUT_SECS, using default"
                );
            }
        }

        if let Ok(attempts) = std::env::var("STRATUS_MONITOR_MAX_ATTEMPTS") {
            if let Ok(parsed) = attempts.parse::<u32>()
                && parsed > 0
            {
                config.monitor_max_attempts = parsed;
            } else {
                tracing::warn!(
                    value = %attempts,
                    "Invalid STRATUS_MONITOR_MAX_ATTEMPTS, using default"
                );
            }
        }

        if let Ok(retry) = std::env::var("STRATUS_STORAGE_RETRY_SECS") {
            if let Ok(parsed) = retry.parse::<u64>()
                && parsed > 0
            {
                config.storage_retry_secs = parsed;
            } else {
                tracing::warn!(
                    value = %retry,
                    "Invalid STRATUS_STORAGE_RETRY_SECS, using default"
                );
            }
        }

        if let Ok(timeout) = std::env::var("STRATUS_SHUTDOWN_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                config.shutdown_timeout_secs = parsed;
            } else {
                tracing::warn!(
                    value = %timeout,
                    "Invalid STRATUS_SHUTDOWN_TIMEOUT_SECS, using default"
                );
            }
        }

        if let Ok(agent) = std::env::var("STRATUS_DISCOVERY_AGENT")
            && !agent.trim().is_empty()
        {
            config.discovery_agent = Some(agent);
        }

        if let Ok(dir) = std::env::var("STRATUS_LOG_DIR")
            && !dir.trim().is_empty()
        {
            config.log_dir = Some(dir);
        }

        config
    }

    /// Monitor settings derived from this configuration.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_secs(self.monitor_interval_secs),
            ping_timeout: Duration::from_secs(self.monitor_timeout_secs),
            max_attempts: self.monitor_max_attempts,
        }
    }

    /// Retry policy for the storage readiness wait.
    pub fn storage_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_secs(self.storage_retry_secs))
    }

    /// Grace period applied to each shutdown stage.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
