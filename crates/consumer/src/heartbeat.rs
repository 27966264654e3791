//! Heartbeat: liveness beacon scheduling.

use crate::traits::Group;
use consumer_model::HeartbeatError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Sends a liveness beacon to the group coordinator at an interval strictly
/// smaller than the group session timeout, so a slow-but-healthy consumer
/// is not evicted.
pub struct Heartbeat {
    group: Arc<dyn Group>,
    interval: Duration,
    last_sent: Mutex<Option<Instant>>,
}

impl Heartbeat {
    pub fn new(group: Arc<dyn Group>, interval: Duration) -> Self {
        Self {
            group,
            interval,
            last_sent: Mutex::new(None),
        }
    }

    /// Sends a beacon only if `interval` has elapsed since the last
    /// successful one. Cheap and idempotent when called more often than
    /// that — callers are expected to call this at least once per user
    /// callback, and once more before each fetch. Returns whether a beacon
    /// was actually sent, so callers can distinguish a real send from a
    /// no-op (e.g. to drive a liveness-tracking hook only on real sends).
    pub async fn send_if_necessary(&self) -> Result<bool, HeartbeatError> {
        let due = {
            let last_sent = self.last_sent.lock();
            match *last_sent {
                Some(last) => last.elapsed() >= self.interval,
                None => true,
            }
        };

        if !due {
            return Ok(false);
        }

        self.group.heartbeat().await?;
        *self.last_sent.lock() = Some(Instant::now());
        debug!("heartbeat sent");
        Ok(true)
    }

    /// Forgets the last-sent time, so the next call to
    /// `send_if_necessary` sends unconditionally. Used after a rejoin,
    /// since a fresh generation invalidates any prior cadence.
    pub fn reset(&self) {
        *self.last_sent.lock() = None;
    }
}
