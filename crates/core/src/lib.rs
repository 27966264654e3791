//! Core data model and error taxonomy shared by the group-coordinated
//! consumer and its collaborator traits.

pub mod assignment;
pub mod error;
pub mod message;
pub mod seed;

pub use assignment::{Assignment, Generation};
pub use error::{
    ConnectionError, ConsumeError, FetchError, GroupError, HeartbeatError, OffsetCommitError,
    Result,
};
pub use message::{Batch, Message};
pub use seed::SeedOffset;
