//! Seed-offset policy: where to start a partition with no committed offset.

use serde::{Deserialize, Serialize};

/// Where to begin consuming a partition the member has just been assigned
/// and for which no committed offset exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedOffset {
    /// Start from the log start.
    Earliest,
    /// Start from the log end, i.e. consume only new writes.
    Latest,
}

impl Default for SeedOffset {
    fn default() -> Self {
        Self::Earliest
    }
}
