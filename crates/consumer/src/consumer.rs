//! `Consumer`: the public entry point and consume-loop state machine.
//!
//! See SPEC_FULL.md §4.1 for the full transition table this loop
//! implements. The short version: join the group, fetch, dispatch to the
//! user callback with heartbeat/commit interleaved after every item, and
//! recover locally from the handful of error kinds that don't require
//! surfacing out of the loop.

use crate::config::{ConsumerConfig, FetchCallOptions, TopicSubscription};
use crate::fetch::FetchOperation;
use crate::heartbeat::Heartbeat;
use crate::state::ConsumerState;
use crate::traits::{
    BatchAttrs, Cluster, Group, Instrumenter, JoinResult, MessageAttrs, NoopInstrumenter,
    OffsetManager,
};
use consumer_model::{Assignment, Batch, ConsumeError, FetchError, Generation, Message, Result, SeedOffset};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Cooperative cancellation token observed at the two boundaries named in
/// SPEC_FULL.md §5: after each message/batch callback, and at the top of
/// the outer loop. Cloning shares the same underlying flag, so a handle
/// obtained from [`Consumer::stop_handle`] can request shutdown from a
/// different task than the one driving the consume loop.
#[derive(Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Requests graceful shutdown at the next safe point. Non-blocking.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// What to do next after dispatching one fetch's worth of batches/messages.
enum LoopSignal {
    /// Dispatch completed normally; fetch again.
    Continue,
    /// `stop()` was observed; run the shutdown tail and return `Ok(())`.
    Stop,
    /// A commit or heartbeat failed mid-dispatch; rejoin before the next fetch.
    Rejoin,
    /// The user callback failed, or another unrecoverable error occurred.
    Fail(ConsumeError),
}

/// The group-coordinated consumer.
///
/// Owns none of its three collaborators (`Cluster`, `Group`,
/// `OffsetManager`) — they are caller-supplied, shared via `Arc<dyn
/// Trait>`, and may be shared with other components of the host
/// application. `Consumer` itself is not re-entrant: `each_message` and
/// `each_batch` take `&mut self`, so the compiler rejects two concurrent
/// calls driving the loop on the same `Consumer` at once. `stop()` is
/// still reachable mid-loop from another task via the free-standing,
/// `Clone`-able [`StopHandle`] returned by [`Self::stop_handle`], which
/// does not borrow `self` at all.
pub struct Consumer {
    config: ConsumerConfig,
    cluster: Arc<dyn Cluster>,
    group: Arc<dyn Group>,
    offset_manager: Arc<dyn OffsetManager>,
    instrumenter: Arc<dyn Instrumenter>,
    heartbeat: Heartbeat,
    subscriptions: RwLock<HashMap<String, TopicSubscription>>,
    assignment: RwLock<Assignment>,
    generation: Mutex<Option<Generation>>,
    stop_handle: StopHandle,
    state: RwLock<ConsumerState>,
}

impl Consumer {
    pub fn new(
        config: ConsumerConfig,
        cluster: Arc<dyn Cluster>,
        group: Arc<dyn Group>,
        offset_manager: Arc<dyn OffsetManager>,
    ) -> Self {
        let heartbeat = Heartbeat::new(group.clone(), config.heartbeat_interval);
        Self {
            config,
            cluster,
            group,
            offset_manager,
            instrumenter: Arc::new(NoopInstrumenter),
            heartbeat,
            subscriptions: RwLock::new(HashMap::new()),
            assignment: RwLock::new(Assignment::new()),
            generation: Mutex::new(None),
            stop_handle: StopHandle::new(),
            state: RwLock::new(ConsumerState::Idle),
        }
    }

    /// Replaces the default no-op instrumenter with one that actually
    /// records timing and emits events (typically `consumer-telemetry`'s).
    pub fn with_instrumenter(mut self, instrumenter: Arc<dyn Instrumenter>) -> Self {
        self.instrumenter = instrumenter;
        self
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// A cloneable handle that can call [`StopHandle::stop`] from any task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    /// Requests graceful shutdown at the next safe point. Equivalent to
    /// `consumer.stop_handle().stop()`.
    pub fn stop(&self) {
        self.stop_handle.stop();
    }

    /// Current position in the consume-loop state machine.
    pub fn state(&self) -> ConsumerState {
        *self.state.read()
    }

    /// Adds `topic` to the group's subscription set, records its seed
    /// policy and fetch cap. Takes effect on the next join — if
    /// `each_message`/`each_batch` has already joined, that means the next
    /// rebalance, not immediately; this mirrors the upstream protocol's
    /// behavior rather than forcing an eager rejoin (see DESIGN.md).
    /// Idempotent for the same topic: calling this again just replaces the
    /// recorded seed policy and fetch cap.
    pub fn subscribe(&self, topic: impl Into<String>, seed: SeedOffset, max_bytes_per_partition: i32) {
        let topic = topic.into();
        self.group.subscribe(&topic);
        self.offset_manager.set_default_offset(&topic, seed);
        let mut subscriptions = self.subscriptions.write();
        subscriptions
            .entry(topic.clone())
            .and_modify(|sub| {
                sub.seed = seed;
                sub.max_bytes_per_partition = max_bytes_per_partition;
            })
            .or_insert_with(|| {
                TopicSubscription::new(topic)
                    .with_seed(seed)
                    .with_max_bytes_per_partition(max_bytes_per_partition)
            });
    }

    /// Runs the consume loop, invoking `callback` exactly once per fetched
    /// message. Returns only when [`Self::stop`] is called or an
    /// unrecoverable error occurs.
    pub async fn each_message<F, Fut, E>(&mut self, call_opts: FetchCallOptions, mut callback: F) -> Result<()>
    where
        F: FnMut(Message) -> Fut,
        Fut: Future<Output = std::result::Result<(), E>> + Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        if self.subscriptions.read().is_empty() {
            return Err(ConsumeError::NoSubscriptions);
        }

        self.stop_handle.reset();
        let mut needs_join = true;

        let outcome: Result<()> = loop {
            if self.stop_handle.is_stopped() {
                break Ok(());
            }

            if needs_join {
                self.set_state(ConsumerState::Joining);
                if let Err(e) = self.join_group().await {
                    break Err(e);
                }
                self.heartbeat.reset();
                needs_join = false;
            }

            self.set_state(ConsumerState::Fetching);
            let batches = match self.fetch_once(&call_opts).await {
                Ok(batches) => batches,
                Err(ConsumeError::Heartbeat(e)) => {
                    warn!(error = %e, "heartbeat failed ahead of fetch, rejoining");
                    self.set_state(ConsumerState::Recovering);
                    needs_join = true;
                    continue;
                }
                Err(ConsumeError::Fetch(fetch_err)) => {
                    self.set_state(ConsumerState::Recovering);
                    self.recover_from_fetch_error(fetch_err).await;
                    continue;
                }
                Err(e) => break Err(e),
            };

            self.set_state(ConsumerState::Dispatching);
            match self.dispatch_each_message(batches, &mut callback).await {
                LoopSignal::Continue => {}
                LoopSignal::Stop => break Ok(()),
                LoopSignal::Rejoin => {
                    self.set_state(ConsumerState::Recovering);
                    needs_join = true;
                    continue;
                }
                LoopSignal::Fail(e) => break Err(e),
            }

            if let Err(e) = self.offset_manager.commit_offsets_if_necessary().await {
                warn!(error = %e, "trailing commit failed, rejoining");
                self.set_state(ConsumerState::Recovering);
                needs_join = true;
            }
        };

        self.shutdown_tail().await;
        outcome
    }

    /// As [`Self::each_message`] but invokes `callback` once per
    /// non-empty batch. Empty batches are silently skipped.
    pub async fn each_batch<F, Fut, E>(&mut self, call_opts: FetchCallOptions, mut callback: F) -> Result<()>
    where
        F: FnMut(Batch) -> Fut,
        Fut: Future<Output = std::result::Result<(), E>> + Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        if self.subscriptions.read().is_empty() {
            return Err(ConsumeError::NoSubscriptions);
        }

        self.stop_handle.reset();
        let mut needs_join = true;

        let outcome: Result<()> = loop {
            if self.stop_handle.is_stopped() {
                break Ok(());
            }

            if needs_join {
                self.set_state(ConsumerState::Joining);
                if let Err(e) = self.join_group().await {
                    break Err(e);
                }
                self.heartbeat.reset();
                needs_join = false;
            }

            self.set_state(ConsumerState::Fetching);
            let batches = match self.fetch_once(&call_opts).await {
                Ok(batches) => batches,
                Err(ConsumeError::Heartbeat(e)) => {
                    warn!(error = %e, "heartbeat failed ahead of fetch, rejoining");
                    self.set_state(ConsumerState::Recovering);
                    needs_join = true;
                    continue;
                }
                Err(ConsumeError::Fetch(fetch_err)) => {
                    self.set_state(ConsumerState::Recovering);
                    self.recover_from_fetch_error(fetch_err).await;
                    continue;
                }
                Err(e) => break Err(e),
            };

            self.set_state(ConsumerState::Dispatching);
            match self.dispatch_each_batch(batches, &mut callback).await {
                LoopSignal::Continue => {}
                LoopSignal::Stop => break Ok(()),
                LoopSignal::Rejoin => {
                    self.set_state(ConsumerState::Recovering);
                    needs_join = true;
                    continue;
                }
                LoopSignal::Fail(e) => break Err(e),
            }

            if let Err(e) = self.offset_manager.commit_offsets_if_necessary().await {
                warn!(error = %e, "trailing commit failed, rejoining");
                self.set_state(ConsumerState::Recovering);
                needs_join = true;
            }
        };

        self.shutdown_tail().await;
        outcome
    }

    async fn dispatch_each_message<F, Fut, E>(&self, batches: Vec<Batch>, callback: &mut F) -> LoopSignal
    where
        F: FnMut(Message) -> Fut,
        Fut: Future<Output = std::result::Result<(), E>> + Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        for batch in batches {
            let offset_lag = batch.offset_lag();
            let topic = batch.topic;
            let partition = batch.partition;

            for message in batch.messages {
                let offset = message.offset;
                let attrs = MessageAttrs {
                    topic: topic.clone(),
                    partition,
                    offset,
                    offset_lag,
                    key: message.key.clone(),
                    value: message.value.clone(),
                };
                let cb: &mut F = callback;
                let body = Box::pin(async move { cb(message).await.map_err(ConsumeError::callback) });

                match self.instrumenter.instrument_message(attrs, body).await {
                    Ok(()) => self.offset_manager.mark_as_processed(&topic, partition, offset),
                    Err(e) => return LoopSignal::Fail(e),
                }

                if let Err(e) = self.offset_manager.commit_offsets_if_necessary().await {
                    warn!(error = %e, "commit failed mid-dispatch, rejoining");
                    return LoopSignal::Rejoin;
                }
                if let Err(e) = self.heartbeat_if_necessary().await {
                    warn!(error = %e, "heartbeat failed mid-dispatch, rejoining");
                    return LoopSignal::Rejoin;
                }
                if self.stop_handle.is_stopped() {
                    return LoopSignal::Stop;
                }
            }
        }
        LoopSignal::Continue
    }

    async fn dispatch_each_batch<F, Fut, E>(&self, batches: Vec<Batch>, callback: &mut F) -> LoopSignal
    where
        F: FnMut(Batch) -> Fut,
        Fut: Future<Output = std::result::Result<(), E>> + Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        for batch in batches {
            if batch.is_empty() {
                continue;
            }

            let topic = batch.topic.clone();
            let partition = batch.partition;
            let offset_lag = batch.offset_lag();
            let highwater_mark_offset = batch.highwater_mark_offset;
            let message_count = batch.len();
            let last_offset = batch.last_offset();

            let attrs = BatchAttrs {
                topic: topic.clone(),
                partition,
                offset_lag,
                highwater_mark_offset,
                message_count,
            };
            let cb: &mut F = callback;
            let body = Box::pin(async move { cb(batch).await.map_err(ConsumeError::callback) });

            match self.instrumenter.instrument_batch(attrs, body).await {
                Ok(()) => {
                    if let Some(offset) = last_offset {
                        self.offset_manager.mark_as_processed(&topic, partition, offset);
                    }
                }
                Err(e) => return LoopSignal::Fail(e),
            }

            if let Err(e) = self.offset_manager.commit_offsets_if_necessary().await {
                warn!(error = %e, "commit failed mid-dispatch, rejoining");
                return LoopSignal::Rejoin;
            }
            if let Err(e) = self.heartbeat_if_necessary().await {
                warn!(error = %e, "heartbeat failed mid-dispatch, rejoining");
                return LoopSignal::Rejoin;
            }
            if self.stop_handle.is_stopped() {
                return LoopSignal::Stop;
            }
        }
        LoopSignal::Continue
    }

    /// Performs the join/sync exchange and applies the rebalance logic of
    /// SPEC_FULL.md §4.1: discard offsets for partitions no longer held,
    /// or discard everything if a generation was missed outright.
    async fn join_group(&self) -> Result<()> {
        let previous_generation = *self.generation.lock();
        let JoinResult { generation, assignment } = self.group.join().await?;

        match previous_generation {
            None => {
                // First join: nothing cached yet, nothing to discard.
            }
            Some(prev) if generation.follows_directly(prev) => {
                self.offset_manager.clear_offsets_excluding(&assignment);
            }
            Some(prev) => {
                info!(
                    old_generation = %prev,
                    new_generation = %generation,
                    "missed a generation, discarding all cached offsets"
                );
                self.offset_manager.clear_offsets();
            }
        }

        if assignment.is_empty() {
            return Err(if self.subscriptions.read().is_empty() {
                ConsumeError::NoSubscriptions
            } else {
                ConsumeError::EmptyAssignment {
                    group_id: self.config.group_id.clone(),
                }
            });
        }

        *self.generation.lock() = Some(generation);
        *self.assignment.write() = assignment;
        info!(generation = %generation, "joined group");
        self.instrumenter.record_join();
        Ok(())
    }

    /// Sends a heartbeat if one is due and, only on an actual send,
    /// notifies the instrumenter so a liveness surface wired through
    /// `with_instrumenter` can track how fresh the last beacon is.
    async fn heartbeat_if_necessary(&self) -> Result<()> {
        if self.heartbeat.send_if_necessary().await? {
            self.instrumenter.record_heartbeat();
        }
        Ok(())
    }

    /// Builds a multi-partition fetch from current offsets and executes it.
    /// Sends a heartbeat first, per SPEC_FULL.md §4.3 ("additionally
    /// before each fetch").
    async fn fetch_once(&self, call_opts: &FetchCallOptions) -> Result<Vec<Batch>> {
        self.heartbeat_if_necessary().await?;

        let assignment = self.assignment.read().clone();
        let subscriptions = self.subscriptions.read();
        let mut op = FetchOperation::new(self.cluster.as_ref());
        for (topic, partition) in assignment.iter() {
            let max_bytes = subscriptions
                .get(topic)
                .map(|sub| sub.max_bytes_per_partition)
                .unwrap_or(1024 * 1024);
            let offset = self.offset_manager.next_offset_for(topic, partition);
            op.fetch_from_partition(topic, partition, offset, max_bytes);
        }
        drop(subscriptions);

        if op.is_empty() {
            return Ok(Vec::new());
        }

        let batches = op.execute(call_opts.min_bytes, call_opts.max_wait_time).await?;
        Ok(batches)
    }

    async fn recover_from_fetch_error(&self, err: FetchError) {
        match err {
            FetchError::LeaderNotAvailable { topic, partition } => {
                warn!(topic = %topic, partition, "leader not available, retrying in 1s");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            FetchError::OffsetOutOfRange { topic, partition, offset } => {
                warn!(
                    topic = %topic,
                    partition,
                    offset,
                    "offset out of range, resetting partition to seed policy"
                );
                self.offset_manager.reset_offset(&topic, partition);
            }
            other => {
                warn!(error = %other, "fetch failed, marking cluster metadata stale");
                self.cluster.mark_as_stale();
            }
        }
    }

    /// Commits outstanding offsets and leaves the group. Guaranteed to run
    /// on every exit path out of `each_message`/`each_batch`, including
    /// exceptional ones — see SPEC_FULL.md §4.1's `Stopping -> Left`
    /// transition.
    async fn shutdown_tail(&self) {
        self.set_state(ConsumerState::Stopping);
        if let Err(e) = self.offset_manager.commit_offsets().await {
            error!(error = %e, "final offset commit failed during shutdown");
        }
        if let Err(e) = self.group.leave().await {
            error!(error = %e, "group leave failed during shutdown");
        }
        self.instrumenter.record_leave();
        self.set_state(ConsumerState::Left);
    }

    fn set_state(&self, state: ConsumerState) {
        *self.state.write() = state;
        debug!(?state, "consumer state transition");
    }
}
