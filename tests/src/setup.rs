//! Common test harness: a `Consumer` wired to the scripted fakes in
//! `mocks`, the same way the teacher's `TestContext` wires a real router
//! to a `MockProducer` — production code paths, swapped collaborators.

use crate::mocks::{InMemoryOffsetManager, ScriptedCluster, ScriptedGroup};
use consumer_core::{Consumer, ConsumerConfig};
use consumer_model::{Assignment, Generation};
use std::sync::Arc;
use std::time::Duration;

/// A `Consumer` plus direct handles to its scripted collaborators, so a
/// test can assert on call counts or mutate the underlying log/script
/// mid-run.
pub struct ConsumerHarness {
    pub consumer: Consumer,
    pub cluster: Arc<ScriptedCluster>,
    pub group: Arc<ScriptedGroup>,
    pub offsets: Arc<InMemoryOffsetManager>,
}

impl ConsumerHarness {
    /// Builds a harness for a single-partition topic assigned outright,
    /// with a short heartbeat interval so tests don't need real-time
    /// waits to exercise heartbeat-interleaved behavior.
    pub fn single_partition(group_id: &str, partition: i32) -> Self {
        let mut assignment = Assignment::new();
        assignment.insert("t", partition);
        let group = Arc::new(ScriptedGroup::single(Generation(1), assignment));
        Self::new(group_id, group)
    }

    pub fn new(group_id: &str, group: Arc<ScriptedGroup>) -> Self {
        let cluster = Arc::new(ScriptedCluster::new());
        let offsets = Arc::new(InMemoryOffsetManager::new());

        let config = ConsumerConfig::new(group_id).with_heartbeat_interval(Duration::from_millis(1));
        let consumer = Consumer::new(
            config,
            cluster.clone() as Arc<dyn consumer_core::Cluster>,
            group.clone() as Arc<dyn consumer_core::Group>,
            offsets.clone() as Arc<dyn consumer_core::OffsetManager>,
        );

        Self {
            consumer,
            cluster,
            group,
            offsets,
        }
    }
}
