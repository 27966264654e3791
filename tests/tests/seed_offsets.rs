//! End-to-end scenarios 1 and 2 from SPEC_FULL.md §8: cold start with the
//! earliest seed, and latest-seed idle-then-burst delivery.

use bytes::Bytes;
use consumer_core::FetchCallOptions;
use consumer_model::{Message, SeedOffset};
use integration_tests::setup::ConsumerHarness;
use parking_lot::Mutex;
use std::sync::Arc;

fn seed_log(topic: &str, partition: i32, count: i64) -> Vec<Message> {
    (0..count)
        .map(|i| Message::new(topic, partition, i, Bytes::from_static(b"v")))
        .collect()
}

/// Scenario 1: a fresh member, earliest seed, two partitions with ten
/// messages each. All twenty must be delivered, in per-partition order,
/// and the final commit must land at the log end for both partitions.
#[tokio::test]
async fn cold_start_earliest_seed_delivers_every_message_then_commits_log_end() {
    let mut harness = {
        use consumer_model::{Assignment, Generation};
        use integration_tests::mocks::ScriptedGroup;
        let mut assignment = Assignment::new();
        assignment.insert("t", 0);
        assignment.insert("t", 1);
        let group = Arc::new(ScriptedGroup::single(Generation(1), assignment));
        ConsumerHarness::new("g", group)
    };

    harness.cluster.append("t", 0, seed_log("t", 0, 10));
    harness.cluster.append("t", 1, seed_log("t", 1, 10));
    harness.consumer.subscribe("t", SeedOffset::Earliest, 1024 * 1024);

    let seen: Arc<Mutex<Vec<(i32, i64)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let stop_handle = harness.consumer.stop_handle();

    harness
        .consumer
        .each_message(FetchCallOptions::default(), move |msg: Message| {
            let seen = seen_clone.clone();
            let stop_handle = stop_handle.clone();
            async move {
                seen.lock().push((msg.partition, msg.offset));
                if seen.lock().len() == 20 {
                    stop_handle.stop();
                }
                Ok::<(), std::io::Error>(())
            }
        })
        .await
        .unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 20);
    let p0: Vec<i64> = seen.iter().filter(|(p, _)| *p == 0).map(|(_, o)| *o).collect();
    let p1: Vec<i64> = seen.iter().filter(|(p, _)| *p == 1).map(|(_, o)| *o).collect();
    assert_eq!(p0, (0..10).collect::<Vec<_>>());
    assert_eq!(p1, (0..10).collect::<Vec<_>>());

    let committed = harness.offsets.committed_offsets();
    assert_eq!(committed.get(&("t".to_string(), 0)), Some(&10));
    assert_eq!(committed.get(&("t".to_string(), 1)), Some(&10));
}

/// Scenario 2: latest seed, no data yet. Only messages appended after the
/// seed resolves should ever reach the callback; a partition that never
/// receives data yields nothing.
#[tokio::test]
async fn latest_seed_skips_backlog_and_only_delivers_the_burst() {
    let mut harness = ConsumerHarness::single_partition("g", 0);
    harness.offsets.set_latest_hint("t", 0, 0);
    harness.consumer.subscribe("t", SeedOffset::Latest, 1024 * 1024);

    // Simulate the producer writing a burst after the member has joined.
    harness.cluster.append("t", 0, seed_log("t", 0, 5));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let stop_handle = harness.consumer.stop_handle();

    harness
        .consumer
        .each_message(FetchCallOptions::default(), move |msg: Message| {
            let seen = seen_clone.clone();
            let stop_handle = stop_handle.clone();
            async move {
                seen.lock().push(msg.offset);
                if msg.offset == 4 {
                    stop_handle.stop();
                }
                Ok::<(), std::io::Error>(())
            }
        })
        .await
        .unwrap();

    assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4]);
}
