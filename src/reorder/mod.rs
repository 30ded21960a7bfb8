//! Optimistic re-prioritisation of a list.
//!
//! A user's up/down click reorders the local store at once and arms a
//! debounce timer. When the timer fires, the whole order of the scope is
//! sent as one bulk commit:
//!
//! 1. **Success**: the store is refetched so it matches the server exactly
//! 2. **Failure**: the store is restored to the snapshot taken before the
//!    first reorder of the batch and an error notice is published. If the
//!    store was reset meanwhile (logout), nothing is restored.
//!
//! The commit runs off the coordinator loop, so reorders made while it is
//! in flight still apply at once and form the next batch. Nothing is
//! retried automatically.

pub mod coordinator;

pub use coordinator::{CommitOutcome, ReorderCoordinator, ReorderHandle, ReorderMessage};
