//! Error taxonomy for the group-coordinated consumer.
//!
//! Each collaborator boundary (Cluster, Group, OffsetManager) gets its own
//! small error type; [`ConsumeError`] is the error surfaced out of the
//! consume loop itself, converging the collaborator errors via `#[from]`.

use thiserror::Error;

/// Result type alias using [`ConsumeError`].
pub type Result<T> = std::result::Result<T, ConsumeError>;

/// Raw transport failure while fetching. Always wrapped into a
/// [`FetchError`] by `FetchOperation` before it reaches the consume loop.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection refused by broker {broker}")]
    Refused { broker: String },

    #[error("connection to broker {broker} timed out")]
    TimedOut { broker: String },

    #[error("transport error talking to broker {broker}: {reason}")]
    Transport { broker: String, reason: String },
}

/// A fetch failed at the broker or transport layer.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Connection(#[from] ConnectionError),

    #[error("broker reported stale metadata for {topic}/{partition}")]
    StaleMetadata { topic: String, partition: i32 },

    #[error("offset {offset} out of range for {topic}/{partition}")]
    OffsetOutOfRange {
        topic: String,
        partition: i32,
        offset: i64,
    },

    #[error("no leader currently available for {topic}/{partition}")]
    LeaderNotAvailable { topic: String, partition: i32 },

    #[error("unknown leader for {topic}/{partition} even after metadata refresh")]
    UnknownLeader { topic: String, partition: i32 },
}

/// The coordinator rejected a liveness beacon.
#[derive(Debug, Error)]
pub enum HeartbeatError {
    #[error("session expired for group {group_id}")]
    SessionExpired { group_id: String },

    #[error("heartbeat rejected: {0}")]
    Rejected(String),
}

impl HeartbeatError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}

/// An offset commit was rejected by the coordinator.
#[derive(Debug, Error)]
pub enum OffsetCommitError {
    #[error("commit rejected, generation {generation} is stale")]
    StaleGeneration { generation: i64 },

    #[error("commit rejected: {0}")]
    Rejected(String),
}

impl OffsetCommitError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}

/// The group-membership sub-protocol failed (join/sync/leave).
#[derive(Debug, Error)]
pub enum GroupError {
    #[error("join failed: {0}")]
    JoinFailed(String),

    #[error("leave failed: {0}")]
    LeaveFailed(String),

    #[error("heartbeat failed: {0}")]
    Heartbeat(#[from] HeartbeatError),
}

impl GroupError {
    pub fn join_failed(msg: impl Into<String>) -> Self {
        Self::JoinFailed(msg.into())
    }

    pub fn leave_failed(msg: impl Into<String>) -> Self {
        Self::LeaveFailed(msg.into())
    }
}

/// Error surfaced out of the consume loop.
///
/// The first four variants are recovered from locally by the consume loop
/// (see the state machine in SPEC_FULL.md §4.1); everything else exits the
/// loop after running the shutdown tail.
#[derive(Debug, Error)]
pub enum ConsumeError {
    #[error("heartbeat error: {0}")]
    Heartbeat(#[from] HeartbeatError),

    #[error("offset commit error: {0}")]
    OffsetCommit(#[from] OffsetCommitError),

    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("group error: {0}")]
    Group(#[from] GroupError),

    /// `subscribe()` was never called before `each_message`/`each_batch`.
    /// A caller programming error; fail fast.
    #[error("no topics subscribed")]
    NoSubscriptions,

    /// The group reported membership with a non-empty subscription set but
    /// a persistently empty assignment. Distinct from [`Self::NoSubscriptions`]
    /// per the resolved open question in SPEC_FULL.md §9.
    #[error("group {group_id} assigned no partitions for a non-empty subscription set")]
    EmptyAssignment { group_id: String },

    /// The user callback returned failure. The offset for that message is
    /// not marked processed; the shutdown tail still runs.
    #[error("callback failed: {0}")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ConsumeError {
    pub fn callback<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Callback(Box::new(err))
    }

    /// Whether the consume loop should recover locally and resume, or
    /// surface the error and run the shutdown tail.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Heartbeat(_) | Self::OffsetCommit(_) | Self::Fetch(_)
        )
    }
}
