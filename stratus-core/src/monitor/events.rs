//! Health monitor events.
//!
//! This module defines the events emitted by the health monitor when a
//! service's probe outcome changes its standing, for consumption by the
//! orchestrator's event log and any future alerting surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted by the health monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HealthEvent {
    /// A probe failed but the service is still below the failure threshold.
    Degraded {
        service_id: String,
        service_name: String,
        consecutive_failures: u32,
        timestamp: DateTime<Utc>,
    },
    /// The failure threshold was reached and the service was marked
    /// unresponsive.
    Unresponsive {
        service_id: String,
        service_name: String,
        consecutive_failures: u32,
        timestamp: DateTime<Utc>,
    },
    /// A previously unresponsive service answered a probe and was restored
    /// to running.
    Recovered {
        service_id: String,
        service_name: String,
        timestamp: DateTime<Utc>,
    },
}

impl HealthEvent {
    /// Get a human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            HealthEvent::Degraded {
                service_name,
                consecutive_failures,
                ..
            } => {
                format!(
                    "{} missed a health probe ({} consecutive)",
                    service_name, consecutive_failures
                )
            }
            HealthEvent::Unresponsive {
                service_name,
                consecutive_failures,
                ..
            } => {
                format!(
                    "{} marked unresponsive after {} consecutive failures",
                    service_name, consecutive_failures
                )
            }
            HealthEvent::Recovered { service_name, .. } => {
                format!("{} recovered", service_name)
            }
        }
    }

    /// Check if this event warrants operator attention.
    pub fn should_alert(&self) -> bool {
        match self {
            HealthEvent::Degraded { .. } => false,
            HealthEvent::Unresponsive { .. } => true,
            HealthEvent::Recovered { .. } => true,
        }
    }
}

/// Broadcaster for health events.
pub struct HealthEventBroadcaster {
    sender: broadcast::Sender<HealthEvent>,
}

impl HealthEventBroadcaster {
    /// Create a new broadcaster with default capacity (256).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new broadcaster with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to health events.
    pub fn subscribe(&self) -> broadcast::Receiver<HealthEvent> {
        self.sender.subscribe()
    }

    /// Publish a health event. Send errors only mean nobody is listening.
    pub fn publish(
        &self,
        event: HealthEvent,
    ) -> Result<usize, broadcast::error::SendError<HealthEvent>> {
        self.sender.send(event)
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for HealthEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for HealthEventBroadcaster {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_description() {
        let event = HealthEvent::Unresponsive {
            service_id: "123".to_string(),
            service_name: "Stratus Storage".to_string(),
            consecutive_failures: 3,
            timestamp: Utc::now(),
        };
        assert!(event.description().contains("Stratus Storage"));
        assert!(event.description().contains('3'));
    }

    #[test]
    fn test_should_alert() {
        let degraded = HealthEvent::Degraded {
            service_id: "123".to_string(),
            service_name: "Test".to_string(),
            consecutive_failures: 1,
            timestamp: Utc::now(),
        };
        assert!(!degraded.should_alert());

        let unresponsive = HealthEvent::Unresponsive {
            service_id: "123".to_string(),
            service_name: "Test".to_string(),
            consecutive_failures: 3,
            timestamp: Utc::now(),
        };
        assert!(unresponsive.should_alert());

        let recovered = HealthEvent::Recovered {
            service_id: "123".to_string(),
            service_name: "Test".to_string(),
            timestamp: Utc::now(),
        };
        assert!(recovered.should_alert());
    }

    #[test]
    fn test_broadcaster_publish_subscribe() {
        let broadcaster = HealthEventBroadcaster::new();
        let mut receiver = broadcaster.subscribe();

        let event = HealthEvent::Recovered {
            service_id: "123".to_string(),
            service_name: "Test".to_string(),
            timestamp: Utc::now(),
        };

        broadcaster.publish(event).unwrap();

        let received = receiver.try_recv().unwrap();
        assert!(matches!(received, HealthEvent::Recovered { .. }));
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let broadcaster = HealthEventBroadcaster::new();
        assert_eq!(broadcaster.subscriber_count(), 0);
        // SendError is expected here; callers ignore it.
        assert!(broadcaster
            .publish(HealthEvent::Recovered {
                service_id: "123".to_string(),
                service_name: "Test".to_string(),
                timestamp: Utc::now(),
            })
            .is_err());
    }
}
