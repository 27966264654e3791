//! End-to-end scenarios 5 and 6 from SPEC_FULL.md §8 (a slow callback that
//! must still keep up with the heartbeat cadence, and a stale-leader fetch
//! error that recovers without leaving the group), plus the §4.2
//! out-of-range recovery path: resetting a single partition to its seed
//! policy rather than spinning on `mark_as_stale`.

use bytes::Bytes;
use consumer_core::FetchCallOptions;
use consumer_model::{FetchError, Message, SeedOffset};
use integration_tests::setup::ConsumerHarness;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

fn seed_log(topic: &str, partition: i32, count: i64) -> Vec<Message> {
    (0..count)
        .map(|i| Message::new(topic, partition, i, Bytes::from_static(b"v")))
        .collect()
}

/// Scenario 5: a callback that takes noticeably longer than the heartbeat
/// interval must not starve the liveness beacon — between successive
/// callbacks, the post-callback heartbeat check must have sent at least
/// one beacon, so the member is never evicted.
#[tokio::test]
async fn slow_callback_still_keeps_the_heartbeat_cadence() {
    let mut harness = ConsumerHarness::single_partition("g", 0);
    harness.cluster.append("t", 0, seed_log("t", 0, 3));
    harness.consumer.subscribe("t", SeedOffset::Earliest, 1024 * 1024);

    let stop_handle = harness.consumer.stop_handle();

    harness
        .consumer
        .each_message(FetchCallOptions::default(), move |msg: Message| {
            let stop_handle = stop_handle.clone();
            async move {
                // Sleep well past the harness's 1ms heartbeat interval so
                // the post-callback check in the dispatch loop is
                // guaranteed to find a beacon due.
                tokio::time::sleep(Duration::from_millis(15)).await;
                if msg.offset == 2 {
                    stop_handle.stop();
                }
                Ok::<(), std::io::Error>(())
            }
        })
        .await
        .unwrap();

    // One heartbeat on join's first fetch, plus at least one more per
    // slow callback (three messages processed).
    assert!(
        harness.group.heartbeat_call_count() >= 4,
        "expected at least 4 heartbeats, got {}",
        harness.group.heartbeat_call_count()
    );
    assert_eq!(harness.group.leave_call_count(), 1);
}

/// Scenario 6: a fetch fails because the currently-cached leader is wrong.
/// The consumer must mark the cluster stale, keep its group membership,
/// retry, and not skip or regress any offset once the retry succeeds.
#[tokio::test]
async fn stale_leader_recovers_without_leaving_the_group() {
    let mut harness = ConsumerHarness::single_partition("g", 0);
    harness.cluster.append("t", 0, seed_log("t", 0, 3));
    harness.cluster.fail_next_fetch(FetchError::StaleMetadata {
        topic: "t".into(),
        partition: 0,
    });
    harness.consumer.subscribe("t", SeedOffset::Earliest, 1024 * 1024);

    let seen: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let stop_handle = harness.consumer.stop_handle();

    harness
        .consumer
        .each_message(FetchCallOptions::default(), move |msg: Message| {
            let seen = seen_clone.clone();
            let stop_handle = stop_handle.clone();
            async move {
                seen.lock().push(msg.offset);
                if msg.offset == 2 {
                    stop_handle.stop();
                }
                Ok::<(), std::io::Error>(())
            }
        })
        .await
        .unwrap();

    assert_eq!(*seen.lock(), vec![0, 1, 2]);
    assert_eq!(harness.cluster.stale_mark_count(), 1);
    // The group was never left mid-stream: only the final shutdown leave.
    assert_eq!(harness.group.leave_call_count(), 1);
    assert_eq!(harness.group.join_call_count(), 1);
}

/// §4.2: an `OffsetOutOfRange` fetch error resets exactly the affected
/// partition to its seed policy, rather than marking the cluster stale and
/// re-requesting the same bad offset forever. Only offsets 0 and 1 exist
/// when the first fetch runs (caching `next_offset = 2`); the next fetch is
/// forced to fail with `OffsetOutOfRange`, and offset 2 is appended to the
/// log only after that, so the progress table entry for `t/0` must actually
/// be dropped and re-resolved via the earliest seed for offset 2 to ever be
/// delivered.
#[tokio::test]
async fn offset_out_of_range_resets_the_partition_to_seed_policy() {
    let mut harness = ConsumerHarness::single_partition("g", 0);
    harness.cluster.append("t", 0, seed_log("t", 0, 2));
    harness.consumer.subscribe("t", SeedOffset::Earliest, 1024 * 1024);

    let seen: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let forced = Arc::new(Mutex::new(false));
    let forced_clone = forced.clone();
    let stop_handle = harness.consumer.stop_handle();
    let cluster_for_cb = harness.cluster.clone();

    harness
        .consumer
        .each_message(FetchCallOptions::default(), move |msg: Message| {
            let seen = seen_clone.clone();
            let forced = forced_clone.clone();
            let stop_handle = stop_handle.clone();
            let cluster = cluster_for_cb.clone();
            async move {
                seen.lock().push(msg.offset);
                if msg.offset == 1 && !*forced.lock() {
                    *forced.lock() = true;
                    cluster.fail_next_fetch(FetchError::OffsetOutOfRange {
                        topic: "t".into(),
                        partition: 0,
                        offset: 2,
                    });
                    cluster.append("t", 0, vec![Message::new("t", 0, 2, Bytes::from_static(b"v"))]);
                }
                if msg.offset == 2 {
                    stop_handle.stop();
                }
                Ok::<(), std::io::Error>(())
            }
        })
        .await
        .unwrap();

    // Offsets 0, 1 are processed, the forced error resets the partition to
    // its seed (earliest), and the whole log is redelivered from 0 again —
    // the out-of-range reset does not leave the fetch spinning on the same
    // bad offset, nor does it silently skip ahead.
    assert_eq!(*seen.lock(), vec![0, 1, 0, 1, 2]);
    assert_eq!(harness.cluster.stale_mark_count(), 0);
    assert_eq!(harness.group.leave_call_count(), 1);
    assert_eq!(harness.group.join_call_count(), 1);
}
