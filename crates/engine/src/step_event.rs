//! Per-step loop events.
//!
//! `StepEvent` is the observation surface: one event per step of the
//! control loop, delivered over the `run_stream` channel so a CLI or
//! any other frontend can render progress live.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::Mode;

/// Events emitted by the control loop as a run progresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepEvent {
    /// The objective was classified as chat or task.
    Classified { mode: Mode, thought: String },

    /// A reasoning step from the planner.
    Thought { content: String },

    /// The planner selected an action.
    ActionPlanned { capability: String, arguments: Value },

    /// A capability was invoked and produced (truncated) output.
    ActionDispatched { capability: String, output: String },

    /// The critic judged the last output.
    Critiqued { is_error: bool, feedback: String },

    /// The run reached a terminal state with a final response.
    Finished { response: String },

    /// A system-level error was recorded (the loop keeps going).
    Error { message: String },

    /// The run was cancelled between steps. No final response exists.
    Aborted { run_id: String },
}

impl StepEvent {
    /// Stable event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Classified { .. } => "classified",
            Self::Thought { .. } => "thought",
            Self::ActionPlanned { .. } => "action_planned",
            Self::ActionDispatched { .. } => "action_dispatched",
            Self::Critiqued { .. } => "critiqued",
            Self::Finished { .. } => "finished",
            Self::Error { .. } => "error",
            Self::Aborted { .. } => "aborted",
        }
    }
}
