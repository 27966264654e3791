//! Liveness surface for a `Consumer`.
//!
//! Mirrors the teacher crate's `ComponentHealth`/`HealthRegistry` shape,
//! scoped to the one component this core can actually report on: whether
//! the member currently holds a valid join and how stale its last
//! heartbeat is relative to the session timeout.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Health status for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn is_serving(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

/// Liveness state for one `Consumer`.
///
/// `record_heartbeat` should be called every time `Heartbeat::send_if_necessary`
/// actually sends a beacon; `report` compares the age of that beacon
/// against `session_timeout` to decide whether the member is at risk of
/// being evicted by the coordinator.
#[derive(Debug)]
pub struct ConsumerHealth {
    is_member: AtomicBool,
    last_heartbeat_at_ms: AtomicU64,
    session_timeout: Duration,
    started_at: Instant,
}

impl ConsumerHealth {
    pub fn new(session_timeout: Duration) -> Self {
        Self {
            is_member: AtomicBool::new(false),
            last_heartbeat_at_ms: AtomicU64::new(0),
            session_timeout,
            started_at: Instant::now(),
        }
    }

    pub fn record_join(&self) {
        self.is_member.store(true, Ordering::Relaxed);
    }

    pub fn record_leave(&self) {
        self.is_member.store(false, Ordering::Relaxed);
    }

    pub fn record_heartbeat(&self) {
        let now_ms = self.started_at.elapsed().as_millis() as u64;
        self.last_heartbeat_at_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Generates a health report for this consumer.
    pub fn report(&self) -> ConsumerHealthReport {
        let is_member = self.is_member.load(Ordering::Relaxed);
        let now_ms = self.started_at.elapsed().as_millis() as u64;
        let last_heartbeat_ms = self.last_heartbeat_at_ms.load(Ordering::Relaxed);
        let heartbeat_age = Duration::from_millis(now_ms.saturating_sub(last_heartbeat_ms));

        let status = if !is_member {
            HealthStatus::Unhealthy
        } else if heartbeat_age >= self.session_timeout {
            HealthStatus::Unhealthy
        } else if heartbeat_age >= self.session_timeout / 2 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        ConsumerHealthReport {
            status,
            is_member,
            heartbeat_age_ms: heartbeat_age.as_millis() as u64,
            session_timeout_ms: self.session_timeout.as_millis() as u64,
        }
    }

    pub fn is_alive(&self) -> bool {
        true
    }

    pub fn is_ready(&self) -> bool {
        self.report().status.is_serving()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerHealthReport {
    pub status: HealthStatus,
    pub is_member: bool,
    pub heartbeat_age_ms: u64,
    pub session_timeout_ms: u64,
}
