//! Execution state: the single record a run mutates as it progresses.
//!
//! Roles never mutate state directly. Each role returns a [`StateUpdate`]
//! (a partial record) and the control loop merges it field-by-field.
//! Append-only fields (`conversation`, `execution_log`) only ever grow;
//! consumers read bounded suffixes via the accessor methods.

use chrono::{DateTime, Utc};
use onager_core::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// How the run was classified: a quick conversational reply or a
/// multi-step task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Chat,
    Task,
}

/// Loop phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Initial planning, before any capability has run.
    Architecting,
    /// Normal forward progress.
    Building,
    /// Terminal: a final response exists.
    Finished,
    /// The last outcome was judged an error; the next plan should fix it.
    ErrorRecovery,
    /// Reserved for human-in-the-loop flows; never routed to by default.
    AwaitingApproval,
}

/// The action the planner selected, waiting to be dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub capability: String,
    pub arguments: Value,
}

/// Per-run enablement for one capability. Capability-specific settings
/// live with the provider, not the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitySetting {
    pub enabled: bool,
}

/// The full state of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionState {
    pub run_id: Uuid,
    pub objective: String,
    /// None until the classifier has run.
    pub mode: Option<Mode>,
    pub status: Status,
    /// Append-only conversational history, ending with the objective.
    pub conversation: Vec<Message>,
    /// Append-only internal log of actions and critiques.
    pub execution_log: Vec<String>,
    /// Non-null only between planning and dispatch.
    pub pending_action: Option<PendingAction>,
    /// Truncated output of the most recent capability invocation.
    pub last_output: String,
    pub last_error: Option<String>,
    /// Consecutive confirmed-error count. Reset on any success.
    pub error_streak: u32,
    pub current_rationale: String,
    /// Set exactly when the run finishes.
    pub final_response: Option<String>,
    /// Remaining planned steps, refreshed opportunistically by the planner.
    pub task_queue: Vec<String>,
    /// Capability enablement for this run. Immutable once started.
    pub active_capabilities: HashMap<String, CapabilitySetting>,
    pub started_at: DateTime<Utc>,
}

impl ExecutionState {
    /// Start a fresh run for the given objective.
    pub fn new(objective: impl Into<String>) -> Self {
        let objective = objective.into();
        Self {
            run_id: Uuid::new_v4(),
            conversation: vec![Message::user(&objective)],
            objective,
            mode: None,
            status: Status::Architecting,
            execution_log: Vec::new(),
            pending_action: None,
            last_output: String::new(),
            last_error: None,
            error_streak: 0,
            current_rationale: String::new(),
            final_response: None,
            task_queue: Vec::new(),
            active_capabilities: HashMap::new(),
            started_at: Utc::now(),
        }
    }

    /// Resume a run on top of prior conversation history.
    pub fn with_history(objective: impl Into<String>, mut history: Vec<Message>) -> Self {
        let mut state = Self::new(objective);
        history.append(&mut state.conversation);
        state.conversation = history;
        state
    }

    /// Set the per-run capability enablement table.
    pub fn with_capabilities(mut self, caps: HashMap<String, CapabilitySetting>) -> Self {
        self.active_capabilities = caps;
        self
    }

    /// Whether the named capability may be planned in this run.
    /// Capabilities absent from the table are enabled.
    pub fn capability_enabled(&self, name: &str) -> bool {
        self.active_capabilities.get(name).map_or(true, |c| c.enabled)
    }

    /// The last `n` conversation messages.
    pub fn recent_conversation(&self, n: usize) -> &[Message] {
        let start = self.conversation.len().saturating_sub(n);
        &self.conversation[start..]
    }

    /// The last `n` execution-log lines.
    pub fn recent_log(&self, n: usize) -> &[String] {
        let start = self.execution_log.len().saturating_sub(n);
        &self.execution_log[start..]
    }

    pub fn is_finished(&self) -> bool {
        self.status == Status::Finished
    }
}

/// A partial state record returned by one role.
///
/// `None` fields are left untouched by the merge; `log_entries` appends.
/// `pending_action` and `clear_pending_action` are separate so a role
/// can distinguish "leave it" from "consume it".
#[derive(Debug, Default, Clone)]
pub struct StateUpdate {
    pub mode: Option<Mode>,
    pub status: Option<Status>,
    pub log_entries: Vec<String>,
    pub pending_action: Option<PendingAction>,
    pub clear_pending_action: bool,
    pub last_output: Option<String>,
    pub last_error: Option<String>,
    pub error_streak: Option<u32>,
    pub rationale: Option<String>,
    pub final_response: Option<String>,
    pub task_queue: Option<Vec<String>>,
}

impl StateUpdate {
    /// Merge this update into the state, field by field.
    pub fn apply(self, state: &mut ExecutionState) {
        if let Some(mode) = self.mode {
            state.mode = Some(mode);
        }
        if let Some(status) = self.status {
            state.status = status;
        }
        state.execution_log.extend(self.log_entries);
        if self.clear_pending_action {
            state.pending_action = None;
        }
        if let Some(action) = self.pending_action {
            state.pending_action = Some(action);
        }
        if let Some(output) = self.last_output {
            state.last_output = output;
        }
        if let Some(error) = self.last_error {
            state.last_error = Some(error);
        }
        if let Some(streak) = self.error_streak {
            state.error_streak = streak;
        }
        if let Some(rationale) = self.rationale {
            state.current_rationale = rationale;
        }
        if let Some(response) = self.final_response {
            state.final_response = Some(response);
        }
        if let Some(queue) = self.task_queue {
            state.task_queue = queue;
        }
    }

    /// True when the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.status.is_none()
            && self.log_entries.is_empty()
            && self.pending_action.is_none()
            && !self.clear_pending_action
            && self.last_output.is_none()
            && self.last_error.is_none()
            && self.error_streak.is_none()
            && self.rationale.is_none()
            && self.final_response.is_none()
            && self.task_queue.is_none()
    }
}
