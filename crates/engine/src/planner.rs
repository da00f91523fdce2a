//! The planner: chooses the next action for task-mode runs.
//!
//! One completion call per cycle over a full state snapshot (objective,
//! memory context, conversation and log windows, remaining task queue,
//! enabled capability specs). Three policies guard the output:
//!
//! - parse failure falls back to `respond_to_user` carrying the raw
//!   completion text, so the user sees what the model said instead of
//!   the run crashing;
//! - a `finish` chosen while the task queue still has entries is
//!   overridden to `respond_to_user` with an unresolved-work notice;
//! - a run arriving here with the error streak already at the limit is
//!   escalated to a fixed human-intervention response.

use onager_core::{CapabilityProvider, CompletionRequest, CompletionService, MemoryService, Message};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::dispatcher::{FINISH, RESPOND_TO_USER};
use crate::extract::extract_decision;
use crate::state::{ExecutionState, PendingAction, StateUpdate};

pub struct Planner {
    completion: Arc<dyn CompletionService>,
    capabilities: Arc<dyn CapabilityProvider>,
    memory: Arc<dyn MemoryService>,
    temperature: f32,
    history_window: usize,
    log_window: usize,
    recall_k: usize,
    error_streak_limit: u32,
}

#[derive(Debug, Deserialize)]
struct PlannerDecision {
    #[serde(default)]
    thought: Option<String>,
    #[serde(alias = "tool_name")]
    capability: String,
    #[serde(default, alias = "args")]
    arguments: Value,
    /// Optional refreshed view of the remaining steps.
    #[serde(default)]
    plan: Option<Vec<String>>,
}

const INTERVENTION_MESSAGE: &str =
    "I retried several times but kept hitting consecutive errors. \
     I need human intervention or an adjustment to my capabilities before continuing.";

impl Planner {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        capabilities: Arc<dyn CapabilityProvider>,
        memory: Arc<dyn MemoryService>,
    ) -> Self {
        Self {
            completion,
            capabilities,
            memory,
            temperature: 0.1,
            history_window: 6,
            log_window: 8,
            recall_k: 3,
            error_streak_limit: 5,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn with_log_window(mut self, window: usize) -> Self {
        self.log_window = window;
        self
    }

    pub fn with_recall_k(mut self, k: usize) -> Self {
        self.recall_k = k;
        self
    }

    pub fn with_error_streak_limit(mut self, limit: u32) -> Self {
        self.error_streak_limit = limit;
        self
    }

    /// Select the next action. Infallible by policy: every failure path
    /// yields a dispatchable `respond_to_user` action.
    pub async fn plan(&self, state: &ExecutionState) -> StateUpdate {
        // Abort escalation: the critic already confirmed the streak hit
        // the limit and recovery is not converging.
        if state.error_streak >= self.error_streak_limit {
            warn!(
                streak = state.error_streak,
                "error streak at limit, escalating to human intervention"
            );
            return StateUpdate {
                pending_action: Some(PendingAction {
                    capability: RESPOND_TO_USER.into(),
                    arguments: json!({ "message": INTERVENTION_MESSAGE }),
                }),
                rationale: Some("Consecutive errors exceeded the retry limit.".into()),
                error_streak: Some(0),
                log_entries: vec!["PLANNER: error limit reached, requesting intervention.".into()],
                ..Default::default()
            };
        }

        let prompt = self.build_prompt(state).await;
        let request = CompletionRequest::new(vec![Message::user(prompt)])
            .with_temperature(self.temperature);

        let response = match self.completion.complete(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!("planner completion failed: {e}");
                return Self::fallback(
                    format!("I hit a provider error while planning the next step: {e}"),
                    format!("Provider error during planning: {e}"),
                );
            }
        };

        let decision = match extract_decision::<PlannerDecision>(&response) {
            Some(decision) => decision,
            None => {
                debug!("planner output unparseable, falling back to respond_to_user");
                return Self::fallback(
                    response,
                    "Failed to parse the planned action; relaying the raw reply.".to_string(),
                );
            }
        };

        let thought = decision
            .thought
            .unwrap_or_else(|| "Planning the next action...".into());
        let arguments = match decision.arguments {
            Value::Null => json!({}),
            other => other,
        };

        // Finishing with unresolved queue entries would silently drop
        // work; report status instead.
        let remaining = decision.plan.as_ref().unwrap_or(&state.task_queue);
        if decision.capability == FINISH && !remaining.is_empty() {
            info!(pending = remaining.len(), "finish overridden: task queue not empty");
            let notice = format!(
                "These steps are still unresolved: {}. Finishing now would leave \
                 the task incomplete, so here is the current status instead: {thought}",
                remaining.join("; ")
            );
            return StateUpdate {
                pending_action: Some(PendingAction {
                    capability: RESPOND_TO_USER.into(),
                    arguments: json!({ "message": notice }),
                }),
                rationale: Some(thought),
                task_queue: decision.plan,
                log_entries: vec!["PLANNER: finish overridden, queue not empty.".into()],
                ..Default::default()
            };
        }

        debug!(capability = %decision.capability, "action planned");
        StateUpdate {
            pending_action: Some(PendingAction {
                capability: decision.capability,
                arguments,
            }),
            rationale: Some(thought),
            task_queue: decision.plan,
            ..Default::default()
        }
    }

    fn fallback(message: String, rationale: String) -> StateUpdate {
        StateUpdate {
            pending_action: Some(PendingAction {
                capability: RESPOND_TO_USER.into(),
                arguments: json!({ "message": message }),
            }),
            rationale: Some(rationale),
            ..Default::default()
        }
    }

    async fn build_prompt(&self, state: &ExecutionState) -> String {
        let memory_context = match self.memory.retrieve(&state.objective, self.recall_k).await {
            Ok(context) => context,
            Err(e) => {
                warn!("memory recall failed for planning: {e}");
                String::new()
            }
        };

        let mut history = String::new();
        for msg in state.recent_conversation(self.history_window) {
            history.push_str(&format!("{}: {}\n", msg.role.to_string().to_uppercase(), msg.content));
        }

        let log = if state.execution_log.is_empty() {
            "No actions taken yet.".to_string()
        } else {
            state.recent_log(self.log_window).join("\n")
        };

        let queue = if state.task_queue.is_empty() {
            "(empty)".to_string()
        } else {
            state.task_queue.join("; ")
        };

        let capabilities = self
            .capabilities
            .specs()
            .into_iter()
            .filter(|spec| state.capability_enabled(&spec.name))
            .map(|spec| format!("- {}: {} | parameters: {}", spec.name, spec.description, spec.parameters))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "OBJECTIVE: \"{objective}\"\n\
             MEMORY CONTEXT: {memory_context}\n\
             CONVERSATION HISTORY:\n{history}\n\
             EXECUTION LOG:\n{log}\n\
             REMAINING TASKS: {queue}\n\n\
             REASONING RULES FOR AUTONOMY:\n\
             1. CRITICAL THINKING: inspect the last log entry. If it was an error, \
             focus your thought on resolving that specific error.\n\
             2. PLANNING: at the start, list the steps. Mid-task, verify the previous \
             step moved you toward the objective.\n\
             3. CAPABILITY SELECTION: pick the most efficient capability for the next step.\n\
             - Use `shell` to check system state before acting.\n\
             - Use `respond_to_user` only when you need information you cannot obtain yourself.\n\
             4. LOOP SAFETY: if you are repeating the same action without success, change strategy.\n\n\
             AVAILABLE CAPABILITIES:\n{capabilities}\n\n\
             To finish the task, use capability \"finish\" with a closing \"message\" argument.\n\
             To reply to the user, use capability \"respond_to_user\" with a \"message\" argument.\n\n\
             RESPOND STRICTLY IN JSON:\n\
             {{\n\
                 \"thought\": \"Step 1: analyze X. Step 2: run Y because Z. If it fails, try W.\",\n\
                 \"capability\": \"capability_name\",\n\
                 \"arguments\": {{ \"arg_name\": \"value\" }},\n\
                 \"plan\": [\"optional list of remaining steps\"]\n\
             }}",
            objective = state.objective,
        )
    }
}
