//! Consumer configuration.

use consumer_model::SeedOffset;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-subscription settings, recorded at `subscribe()` time and applied on
/// the next join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSubscription {
    pub topic: String,
    #[serde(default)]
    pub seed: SeedOffset,
    #[serde(default = "default_max_bytes_per_partition")]
    pub max_bytes_per_partition: i32,
}

fn default_max_bytes_per_partition() -> i32 {
    1024 * 1024 // 1 MiB
}

impl TopicSubscription {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            seed: SeedOffset::default(),
            max_bytes_per_partition: default_max_bytes_per_partition(),
        }
    }

    pub fn with_seed(mut self, seed: SeedOffset) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_bytes_per_partition(mut self, max_bytes: i32) -> Self {
        self.max_bytes_per_partition = max_bytes;
        self
    }
}

/// Per-call fetch options passed to `each_message`/`each_batch`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FetchCallOptions {
    #[serde(default = "default_min_bytes")]
    pub min_bytes: i32,
    #[serde(with = "duration_ms", default = "default_max_wait_time")]
    pub max_wait_time: Duration,
}

fn default_min_bytes() -> i32 {
    1
}

fn default_max_wait_time() -> Duration {
    Duration::from_secs(5)
}

impl Default for FetchCallOptions {
    fn default() -> Self {
        Self {
            min_bytes: default_min_bytes(),
            max_wait_time: default_max_wait_time(),
        }
    }
}

/// Consumer construction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Identifies the coordination group. Must be non-empty.
    pub group_id: String,
    /// Coordinator-side liveness budget.
    #[serde(with = "duration_ms", default = "default_session_timeout")]
    pub session_timeout: Duration,
    /// Liveness beacon cadence. Defaults to roughly a third of
    /// `session_timeout`, following the convention that at least two
    /// beacons must fit inside the session budget with room to spare.
    #[serde(with = "duration_ms", default = "default_heartbeat_interval")]
    pub heartbeat_interval: Duration,
}

fn default_session_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_heartbeat_interval() -> Duration {
    default_session_timeout() / 3
}

impl ConsumerConfig {
    /// Creates a configuration with the default session timeout and
    /// heartbeat interval.
    ///
    /// # Panics
    ///
    /// Panics if `group_id` is empty — a non-empty group id is a hard
    /// precondition, not a recoverable runtime error.
    pub fn new(group_id: impl Into<String>) -> Self {
        let group_id = group_id.into();
        assert!(!group_id.is_empty(), "group_id must not be empty");
        Self {
            group_id,
            session_timeout: default_session_timeout(),
            heartbeat_interval: default_heartbeat_interval(),
        }
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
