//! Group-coordinated consumer: membership, rebalance, fetch, checkpoint,
//! and heartbeat loop, driven over the `Cluster`/`Group`/`OffsetManager`
//! collaborator traits in [`traits`].

pub mod config;
pub mod consumer;
pub mod fetch;
pub mod heartbeat;
pub mod state;
pub mod traits;

pub use config::{ConsumerConfig, FetchCallOptions, TopicSubscription};
pub use consumer::{Consumer, StopHandle};
pub use fetch::FetchOperation;
pub use heartbeat::Heartbeat;
pub use state::ConsumerState;
pub use traits::{
    BatchAttrs, BrokerId, CallbackOutcome, Cluster, Group, Instrumenter, JoinResult, MessageAttrs,
    NoopInstrumenter, OffsetManager, PartitionFetchRequest,
};
