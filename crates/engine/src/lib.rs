//! # Onager Engine
//!
//! The agent control loop: a stateful, cyclic state machine routing
//! between intent classification, planning, capability dispatch, and
//! outcome critique until a terminal state is reached.
//!
//! Every role is a small function from the current [`ExecutionState`]
//! to a partial [`StateUpdate`]; the [`ControlLoop`] merges updates
//! between steps and emits one [`StepEvent`] per step. Failure handling
//! is bounded-retry: confirmed errors increment an error streak, any
//! success resets it, and a run that exhausts the streak limit finishes
//! with a giving-up response instead of spinning forever.

pub mod chat;
pub mod classifier;
pub mod critic;
pub mod dispatcher;
pub mod extract;
pub mod planner;
pub mod router;
pub mod state;
pub mod step_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use chat::ChatResponder;
pub use classifier::IntentClassifier;
pub use critic::OutcomeCritic;
pub use dispatcher::{ActionDispatcher, FINISH, RESPOND_TO_USER};
pub use planner::Planner;
pub use router::{next_role, AbortHandle, ControlLoop, LoopConfig, LoopRole};
pub use state::{CapabilitySetting, ExecutionState, Mode, PendingAction, StateUpdate, Status};
pub use step_event::StepEvent;
