//! The action dispatcher: executes the pending action.
//!
//! Terminal sentinels (`finish`, `respond_to_user`) end the run without
//! touching the capability provider. Everything else goes through the
//! provider; the outcome text is truncated before it enters the state
//! so one noisy command cannot blow up every later prompt.
//!
//! A provider `Err` (the execution machinery itself failed, as opposed
//! to a capability reporting `success: false`) is confirmed on the spot:
//! it increments the streak and puts the run into error recovery without
//! waiting for the critic.

use onager_core::CapabilityProvider;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::state::{ExecutionState, StateUpdate, Status};

/// Sentinel: end the run, the objective is met.
pub const FINISH: &str = "finish";
/// Sentinel: end the run with a message for the user.
pub const RESPOND_TO_USER: &str = "respond_to_user";

const DEFAULT_FINAL_RESPONSE: &str = "Task complete.";

pub struct ActionDispatcher {
    capabilities: Arc<dyn CapabilityProvider>,
    output_max_chars: usize,
}

impl ActionDispatcher {
    pub fn new(capabilities: Arc<dyn CapabilityProvider>) -> Self {
        Self { capabilities, output_max_chars: 500 }
    }

    pub fn with_output_max_chars(mut self, max: usize) -> Self {
        self.output_max_chars = max;
        self
    }

    /// Execute the pending action and consume it.
    pub async fn dispatch(&self, state: &ExecutionState) -> StateUpdate {
        let Some(action) = &state.pending_action else {
            // Unreachable through the router; recover instead of panicking.
            error!("dispatch reached without a pending action");
            return StateUpdate {
                status: Some(Status::ErrorRecovery),
                error_streak: Some(state.error_streak + 1),
                last_error: Some("dispatch without a pending action".into()),
                log_entries: vec!["SYSTEM ERROR: dispatch without a pending action".into()],
                ..Default::default()
            };
        };

        if action.capability == FINISH || action.capability == RESPOND_TO_USER {
            let response = action
                .arguments
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_FINAL_RESPONSE)
                .to_string();
            info!(sentinel = %action.capability, "run finishing");
            return StateUpdate {
                status: Some(Status::Finished),
                final_response: Some(response),
                clear_pending_action: true,
                ..Default::default()
            };
        }

        debug!(capability = %action.capability, "dispatching action");
        match self
            .capabilities
            .execute(&action.capability, &action.arguments)
            .await
        {
            Ok(outcome) => {
                let output = truncate_chars(&outcome.output, self.output_max_chars);
                let marker = if outcome.success { "✅" } else { "❌" };
                StateUpdate {
                    log_entries: vec![format!(
                        "ACTION: {} | STATUS: {marker}\n   Output: {output}",
                        action.capability
                    )],
                    last_output: Some(output),
                    clear_pending_action: true,
                    ..Default::default()
                }
            }
            Err(e) => {
                error!(capability = %action.capability, "capability execution fault: {e}");
                StateUpdate {
                    status: Some(Status::ErrorRecovery),
                    error_streak: Some(state.error_streak + 1),
                    last_error: Some(e.to_string()),
                    // Clear the output so the critic skips this cycle and
                    // the recovery status survives to the next plan.
                    last_output: Some(String::new()),
                    log_entries: vec![format!("SYSTEM ERROR: {e}")],
                    clear_pending_action: true,
                    ..Default::default()
                }
            }
        }
    }
}

/// Truncate to at most `max` characters on a char boundary.
/// Idempotent: truncating already-truncated text is a no-op.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
