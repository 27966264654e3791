//! Assignment and Generation: what this member owns, and when it changed.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// An integer token issued by the group coordinator; strictly increasing
/// across successful joins for a given group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub i64);

impl Generation {
    /// Whether `self` is exactly one generation past `previous` — i.e. the
    /// member was continuously present across the rebalance that produced
    /// `self`.
    pub fn follows_directly(self, previous: Generation) -> bool {
        self.0 == previous.0 + 1
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mapping from topic to the set of partitions this member currently owns.
///
/// Created by the `Group` collaborator on successful join/sync; replaced
/// atomically on each rebalance; never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment(HashMap<String, BTreeSet<i32>>);

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: HashMap<String, BTreeSet<i32>>) -> Self {
        Self(map)
    }

    pub fn insert(&mut self, topic: impl Into<String>, partition: i32) {
        self.0.entry(topic.into()).or_default().insert(partition);
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|parts| parts.is_empty())
    }

    pub fn contains(&self, topic: &str, partition: i32) -> bool {
        self.0
            .get(topic)
            .map(|parts| parts.contains(&partition))
            .unwrap_or(false)
    }

    pub fn partitions_for(&self, topic: &str) -> impl Iterator<Item = i32> + '_ {
        self.0.get(topic).into_iter().flatten().copied()
    }

    /// Iterate over every `(topic, partition)` pair in the assignment.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> + '_ {
        self.0
            .iter()
            .flat_map(|(topic, parts)| parts.iter().map(move |&p| (topic.as_str(), p)))
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(|s| s.as_str())
    }
}
