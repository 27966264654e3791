//! FetchOperation: coalesce per-partition fetch requests into per-broker
//! multiplexed requests, dispatch them, and return a flat ordered sequence
//! of batches.

use crate::traits::{BrokerId, Cluster, PartitionFetchRequest};
use consumer_model::{Batch, FetchError};
use std::collections::HashMap;
use std::time::Duration;

/// Accumulates per-partition fetch requests for one iteration of the
/// consume loop, then executes them grouped by leader broker.
pub struct FetchOperation<'a> {
    cluster: &'a dyn Cluster,
    pending: Vec<PartitionFetchRequest>,
}

impl<'a> FetchOperation<'a> {
    pub fn new(cluster: &'a dyn Cluster) -> Self {
        Self {
            cluster,
            pending: Vec::new(),
        }
    }

    /// Registers one partition in the pending request.
    pub fn fetch_from_partition(
        &mut self,
        topic: impl Into<String>,
        partition: i32,
        offset: i64,
        max_bytes: i32,
    ) {
        self.pending.push(PartitionFetchRequest {
            topic: topic.into(),
            partition,
            offset,
            max_bytes,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Groups registered partitions by their current leader broker, issues
    /// one fetch per broker, and returns all batches in the order brokers
    /// were resolved followed by the order partitions were registered
    /// within that broker's group.
    ///
    /// Fatal errors (connection refused, unknown leader after refresh)
    /// bubble as a [`FetchError`]; per-partition broker-reported errors are
    /// left for the caller to classify from the returned batches — this
    /// implementation surfaces them as [`FetchError`] too, since every
    /// error variant already carries the offending topic/partition.
    pub async fn execute(
        self,
        min_bytes: i32,
        max_wait_time: Duration,
    ) -> Result<Vec<Batch>, FetchError> {
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_broker: HashMap<BrokerId, Vec<PartitionFetchRequest>> = HashMap::new();
        let mut broker_order: Vec<BrokerId> = Vec::new();

        for req in self.pending {
            let broker = self
                .cluster
                .leader_for(&req.topic, req.partition)
                .await?;
            if !by_broker.contains_key(&broker) {
                broker_order.push(broker.clone());
            }
            by_broker.entry(broker).or_default().push(req);
        }

        let mut batches = Vec::new();
        for broker in broker_order {
            let requests = by_broker.remove(&broker).unwrap_or_default();
            let mut result = self
                .cluster
                .fetch(&broker, &requests, min_bytes, max_wait_time)
                .await?;
            batches.append(&mut result);
        }

        Ok(batches)
    }
}
