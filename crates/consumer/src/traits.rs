//! Collaborator interfaces consumed by the core: `Cluster`, `Group`,
//! `OffsetManager`, and `Instrumenter`.
//!
//! These are traits, not concrete clients: the wire protocol codec, the
//! cluster metadata layer, and the group-membership and offset-storage
//! sub-protocols are out of scope for this crate (see SPEC_FULL.md §1).
//! A host application supplies real implementations; the `tests` workspace
//! member supplies in-memory fakes.

use async_trait::async_trait;
use consumer_model::{Assignment, FetchError, Generation, GroupError, HeartbeatError};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Opaque identifier for a broker, as resolved by the cluster metadata
/// layer. Only used to group per-partition fetch requests by destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BrokerId(pub String);

/// One partition's worth of a pending fetch request, registered with
/// `FetchOperation::fetch_from_partition`.
#[derive(Debug, Clone)]
pub struct PartitionFetchRequest {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub max_bytes: i32,
}

/// The cluster metadata + transport layer. Resolves leaders and executes
/// multiplexed fetch RPCs; `mark_as_stale` forces the next resolution to
/// refresh rather than use cached metadata.
#[async_trait]
pub trait Cluster: Send + Sync + 'static {
    /// Resolves the broker currently leading `topic`/`partition`.
    async fn leader_for(&self, topic: &str, partition: i32) -> Result<BrokerId, FetchError>;

    /// Issues one multiplexed fetch against `broker` for every partition in
    /// `requests` (all must be led by `broker`), waiting up to `max_wait`
    /// for at least `min_bytes` total before returning.
    async fn fetch(
        &self,
        broker: &BrokerId,
        requests: &[PartitionFetchRequest],
        min_bytes: i32,
        max_wait: Duration,
    ) -> Result<Vec<consumer_model::Batch>, FetchError>;

    /// Forces the next leader resolution to refresh cached metadata rather
    /// than trust what is cached.
    fn mark_as_stale(&self);
}

/// The result of a successful join/sync exchange.
#[derive(Debug, Clone)]
pub struct JoinResult {
    pub generation: Generation,
    pub assignment: Assignment,
}

/// The group-membership sub-protocol: JoinGroup/SyncGroup, partition
/// assignment, and the opaque generation token.
///
/// Extends the literal operation list in SPEC_FULL.md §6 with `heartbeat`
/// — see §4.3's resolved open question.
#[async_trait]
pub trait Group: Send + Sync + 'static {
    /// Adds `topic` to the pending subscription set. Takes effect on the
    /// next join (first join, or any later rebalance-triggered rejoin);
    /// idempotent for the same topic.
    fn subscribe(&self, topic: &str);

    /// Performs the JoinGroup/SyncGroup exchange and returns the resulting
    /// generation and assignment.
    async fn join(&self) -> Result<JoinResult, GroupError>;

    /// Leaves the group. Called once, from the shutdown tail.
    async fn leave(&self) -> Result<(), GroupError>;

    /// Whether this member currently holds a valid join.
    fn is_member(&self) -> bool;

    /// The generation token from the most recent successful join, if any.
    fn generation_id(&self) -> Option<Generation>;

    /// The assignment from the most recent successful join.
    fn assigned_partitions(&self) -> Assignment;

    /// Sends one liveness beacon to the coordinator.
    async fn heartbeat(&self) -> Result<(), HeartbeatError>;
}

/// The offset storage sub-protocol. See SPEC_FULL.md §4.4 for the full
/// contract of each operation.
#[async_trait]
pub trait OffsetManager: Send + Sync + 'static {
    fn set_default_offset(&self, topic: &str, policy: consumer_model::SeedOffset);

    fn next_offset_for(&self, topic: &str, partition: i32) -> i64;

    fn mark_as_processed(&self, topic: &str, partition: i32, offset: i64);

    async fn commit_offsets_if_necessary(
        &self,
    ) -> Result<(), consumer_model::OffsetCommitError>;

    async fn commit_offsets(&self) -> Result<(), consumer_model::OffsetCommitError>;

    fn clear_offsets(&self);

    fn clear_offsets_excluding(&self, assignment: &Assignment);

    /// Drops the cached `next_offset` for exactly this partition, so the
    /// next call to `next_offset_for` re-resolves it via the seed policy
    /// rather than re-requesting the offset that was just reported out of
    /// range.
    fn reset_offset(&self, topic: &str, partition: i32);
}

/// Attributes attached to the `process_message.consumer` event.
#[derive(Debug, Clone)]
pub struct MessageAttrs {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub offset_lag: Option<i64>,
    pub key: Option<bytes::Bytes>,
    pub value: bytes::Bytes,
}

/// Attributes attached to the `process_batch.consumer` event.
#[derive(Debug, Clone)]
pub struct BatchAttrs {
    pub topic: String,
    pub partition: i32,
    pub offset_lag: Option<i64>,
    pub highwater_mark_offset: i64,
    pub message_count: usize,
}

/// The outcome of one callback invocation, as observed by the instrumenter.
pub type CallbackOutcome = Result<(), consumer_model::ConsumeError>;

type BoxedCallback<'a> = Pin<Box<dyn Future<Output = CallbackOutcome> + Send + 'a>>;

/// Wraps each user-callback invocation so timing and failures can be
/// observed. Implementers must poll `body` to completion and return its
/// result unchanged — this is what "invoke the callback inside the
/// instrumentation scope" (SPEC_FULL.md §6) means in practice.
#[async_trait]
pub trait Instrumenter: Send + Sync + 'static {
    async fn instrument_message<'a>(
        &'a self,
        attrs: MessageAttrs,
        body: BoxedCallback<'a>,
    ) -> CallbackOutcome;

    async fn instrument_batch<'a>(
        &'a self,
        attrs: BatchAttrs,
        body: BoxedCallback<'a>,
    ) -> CallbackOutcome;

    /// Called once after each successful `Group::join`, before the first
    /// fetch of that generation. No-op by default.
    fn record_join(&self) {}

    /// Called once from the shutdown tail, after `Group::leave` has been
    /// attempted. No-op by default.
    fn record_leave(&self) {}

    /// Called every time `Heartbeat::send_if_necessary` actually sends a
    /// beacon (not on the no-op calls in between). No-op by default.
    fn record_heartbeat(&self) {}
}

/// An instrumenter that does nothing but run the callback. Used as the
/// default when no telemetry sink is wired up.
pub struct NoopInstrumenter;

#[async_trait]
impl Instrumenter for NoopInstrumenter {
    async fn instrument_message<'a>(
        &'a self,
        _attrs: MessageAttrs,
        body: BoxedCallback<'a>,
    ) -> CallbackOutcome {
        body.await
    }

    async fn instrument_batch<'a>(
        &'a self,
        _attrs: BatchAttrs,
        body: BoxedCallback<'a>,
    ) -> CallbackOutcome {
        body.await
    }
}
