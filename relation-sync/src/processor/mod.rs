//! Processor module for relation sync.
//!
//! Classifies change events and derives the union writes each one requires.
//! Derivation is pure; the dispatcher hands the result to the loader.

mod dispatcher;
mod group_reactor;
mod notification_reactor;
mod outcome;

pub use dispatcher::ReactionDispatcher;
pub use group_reactor::GroupCreationReactor;
pub use notification_reactor::NotificationTransitionReactor;
pub use outcome::{ChangeCategory, Derivation, IgnoreReason, ReactionOutcome};
