//! The consume-loop state machine, exposed read-only for introspection and
//! tests. See SPEC_FULL.md §4.1 for the full transition table.

/// Where the consume loop currently is. Transitions are driven entirely by
/// `Consumer::each_message`/`each_batch`; nothing outside this
/// crate ever writes to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Before the first call to `each_message`/`each_batch`.
    Idle,
    /// Waiting on `Group::join` to report a non-empty assignment.
    Joining,
    /// A fetch is in flight.
    Fetching,
    /// Dispatching batches/messages returned by the last fetch.
    Dispatching,
    /// Recovering from a locally-handled error before rejoining or
    /// refetching.
    Recovering,
    /// `stop()` was observed; running the shutdown tail.
    Stopping,
    /// The shutdown tail completed; `group.leave()` has returned.
    Left,
}
