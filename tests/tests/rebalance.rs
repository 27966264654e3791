//! End-to-end scenarios 3 and 4 from SPEC_FULL.md §8: a rebalance that
//! shrinks this member's assignment, and a missed generation that forces
//! the whole progress table to be dropped.
//!
//! Both scenarios force the rejoin deterministically via a scripted
//! `commit_offsets_if_necessary` failure (rather than a heartbeat-timing
//! race) so the exact message at which the rebalance lands is known.

use bytes::Bytes;
use consumer_core::FetchCallOptions;
use consumer_model::{Assignment, Generation, Message, OffsetCommitError, SeedOffset};
use integration_tests::mocks::ScriptedGroup;
use integration_tests::setup::ConsumerHarness;
use parking_lot::Mutex;
use std::sync::Arc;

fn seed_log(topic: &str, partition: i32, count: i64) -> Vec<Message> {
    (0..count)
        .map(|i| Message::new(topic, partition, i, Bytes::from_static(b"v")))
        .collect()
}

fn assignment(parts: &[i32]) -> Assignment {
    let mut a = Assignment::new();
    for &p in parts {
        a.insert("t", p);
    }
    a
}

/// Scenario 3: generation 1 holds {t/0, t/1}; generation 2 (member B
/// joining) shrinks this member down to {t/0}. The rejoin is forced right
/// after the first message (t/0 offset 0) is processed, so partition 1 is
/// never touched at all and partition 0 resumes exactly where it left off.
#[tokio::test]
async fn rebalance_prunes_released_partitions_without_reprocessing_retained_ones() {
    let group = Arc::new(ScriptedGroup::new(vec![
        Ok(consumer_core::JoinResult {
            generation: Generation(1),
            assignment: assignment(&[0, 1]),
        }),
        Ok(consumer_core::JoinResult {
            generation: Generation(2),
            assignment: assignment(&[0]),
        }),
    ]));
    let mut harness = ConsumerHarness::new("g", group);

    harness.cluster.append("t", 0, seed_log("t", 0, 3));
    harness.cluster.append("t", 1, seed_log("t", 1, 3));
    harness.consumer.subscribe("t", SeedOffset::Earliest, 1024 * 1024);

    let seen: Arc<Mutex<Vec<(i32, i64)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let forced = Arc::new(Mutex::new(false));
    let forced_clone = forced.clone();
    let stop_handle = harness.consumer.stop_handle();
    let offsets_for_cb = harness.offsets.clone();

    harness
        .consumer
        .each_message(FetchCallOptions::default(), move |msg: Message| {
            let seen = seen_clone.clone();
            let forced = forced_clone.clone();
            let stop_handle = stop_handle.clone();
            let offsets = offsets_for_cb.clone();
            async move {
                seen.lock().push((msg.partition, msg.offset));
                if msg.partition == 0 && msg.offset == 0 && !*forced.lock() {
                    *forced.lock() = true;
                    offsets.fail_next_commit(OffsetCommitError::StaleGeneration { generation: 1 });
                }
                if msg.partition == 0 && msg.offset == 2 {
                    stop_handle.stop();
                }
                Ok::<(), std::io::Error>(())
            }
        })
        .await
        .unwrap();

    assert_eq!(harness.group.join_call_count(), 2);

    // Partition 1 is never fetched again once generation 2 drops it — and
    // the forced rejoin lands before even its first message was reached.
    let p1_count = seen.lock().iter().filter(|(p, _)| *p == 1).count();
    assert_eq!(p1_count, 0, "partition 1 must not be fetched once it's released");

    // Partition 0 resumes from offset 1 after the rejoin (offset 0's
    // progress survives, since generation 2 follows 1 directly): no gaps,
    // no repeats.
    let p0: Vec<i64> = seen.lock().iter().filter(|(p, _)| *p == 0).map(|(_, o)| *o).collect();
    assert_eq!(p0, vec![0, 1, 2]);
}

/// Scenario 4: the member misses one or more generations outright (e.g. a
/// long network partition). The whole progress table — not just released
/// partitions — must be cleared, so the retained partition restarts from
/// the seed policy rather than from where it left off.
#[tokio::test]
async fn missed_generation_clears_the_entire_progress_table() {
    let group = Arc::new(ScriptedGroup::new(vec![
        Ok(consumer_core::JoinResult {
            generation: Generation(1),
            assignment: assignment(&[0]),
        }),
        // Generation jumps from 1 to 5: three rebalances happened while
        // this member was unreachable.
        Ok(consumer_core::JoinResult {
            generation: Generation(5),
            assignment: assignment(&[0]),
        }),
    ]));
    let mut harness = ConsumerHarness::new("g", group);

    harness.cluster.append("t", 0, seed_log("t", 0, 5));
    harness.consumer.subscribe("t", SeedOffset::Earliest, 1024 * 1024);

    let seen: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let forced = Arc::new(Mutex::new(false));
    let forced_clone = forced.clone();
    let stop_handle = harness.consumer.stop_handle();
    let offsets_for_cb = harness.offsets.clone();

    harness
        .consumer
        .each_message(FetchCallOptions::default(), move |msg: Message| {
            let seen = seen_clone.clone();
            let forced = forced_clone.clone();
            let stop_handle = stop_handle.clone();
            let offsets = offsets_for_cb.clone();
            async move {
                seen.lock().push(msg.offset);
                if msg.offset == 1 && !*forced.lock() {
                    *forced.lock() = true;
                    offsets.fail_next_commit(OffsetCommitError::StaleGeneration { generation: 1 });
                }
                if msg.offset == 4 {
                    stop_handle.stop();
                }
                Ok::<(), std::io::Error>(())
            }
        })
        .await
        .unwrap();

    assert_eq!(harness.group.join_call_count(), 2);

    // Offsets 0 and 1 were processed before the forced rejoin, then the
    // entire table was cleared, so the post-rejoin fetch resolved via the
    // seed policy again and redelivered the full log — a direct
    // consequence of discarding local memory instead of trusting it.
    assert_eq!(*seen.lock(), vec![0, 1, 0, 1, 2, 3, 4]);

    let committed = harness.offsets.committed_offsets();
    assert_eq!(committed.get(&("t".to_string(), 0)), Some(&5));
}
