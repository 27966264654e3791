//! Message and Batch: the immutable units of data flowing out of a fetch.

use bytes::Bytes;

/// An immutable record read from one partition of one topic.
///
/// Invariant: within one partition, offsets observed by a single consumer
/// are strictly increasing across the sequence it sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Bytes>,
    pub value: Bytes,
    /// Broker-assigned creation time, milliseconds since epoch, when present.
    pub timestamp_ms: Option<i64>,
}

impl Message {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, value: Bytes) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            value,
            timestamp_ms: None,
        }
    }

    pub fn with_key(mut self, key: Bytes) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_timestamp_ms(mut self, ts: i64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }
}

/// A contiguous run of [`Message`]s from a single topic+partition.
///
/// Invariant: all messages in a batch share `topic` and `partition`; their
/// offsets are contiguous with respect to the log. A batch may be empty
/// when the fetch wait expired with no new data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub topic: String,
    pub partition: i32,
    pub messages: Vec<Message>,
    /// The cluster's current end-of-log offset for this partition, observed
    /// at fetch time.
    pub highwater_mark_offset: i64,
}

impl Batch {
    pub fn empty(topic: impl Into<String>, partition: i32, highwater_mark_offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            messages: Vec::new(),
            highwater_mark_offset,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn last_offset(&self) -> Option<i64> {
        self.messages.last().map(|m| m.offset)
    }

    /// `highwater_mark_offset - last_message.offset - 1`, or `None` for an
    /// empty batch (there is no last message to measure lag from).
    pub fn offset_lag(&self) -> Option<i64> {
        self.last_offset()
            .map(|last| self.highwater_mark_offset - last - 1)
    }
}
