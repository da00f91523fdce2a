//! The outcome critic: judges whether the last capability output means
//! progress or failure.
//!
//! One completion call asking for `{is_error, feedback}`. When the model
//! answer cannot be parsed (or the call fails), a substring heuristic on
//! the output stands in, so the verdict never blocks the loop. The critic
//! owns the streak bookkeeping: confirmed errors increment it, success
//! resets it, and hitting the limit finishes the run with a giving-up
//! response.

use onager_core::{CompletionRequest, CompletionService, Message};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::extract::extract_decision;
use crate::state::{ExecutionState, StateUpdate, Status};

pub struct OutcomeCritic {
    completion: Arc<dyn CompletionService>,
    temperature: f32,
    error_streak_limit: u32,
}

#[derive(Debug, Deserialize)]
struct CriticVerdict {
    #[serde(default)]
    is_error: bool,
    #[serde(default)]
    feedback: Option<String>,
}

const GIVING_UP_RESPONSE: &str =
    "I'm sorry — I tried several times but ran into consecutive errors. \
     I need human intervention or an adjustment to my capabilities.";

impl OutcomeCritic {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self {
            completion,
            temperature: 0.1,
            error_streak_limit: 5,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_error_streak_limit(mut self, limit: u32) -> Self {
        self.error_streak_limit = limit;
        self
    }

    /// Judge the last output. Skipped (empty update) when there is no
    /// output to judge — this also lets a dispatcher-confirmed error
    /// pass through untouched.
    pub async fn critique(&self, state: &ExecutionState) -> StateUpdate {
        if state.last_output.is_empty() {
            debug!("no output to critique, skipping");
            return StateUpdate::default();
        }

        let prompt = format!(
            "ORIGINAL OBJECTIVE: \"{objective}\"\n\
             LAST CAPABILITY OUTPUT:\n{output}\n\n\
             Review the output above. Did the capability complete the action \
             successfully, or did it hit an error (e.g. syntax error, permission \
             denied, file not found, invalid command)?\n\
             Respond STRICTLY in JSON:\n\
             {{\n\
                 \"is_error\": true or false,\n\
                 \"feedback\": \"What went wrong and how the planner should correct \
                 it next iteration. If it succeeded, just confirm.\"\n\
             }}",
            objective = state.objective,
            output = state.last_output,
        );

        let request = CompletionRequest::new(vec![Message::user(prompt)])
            .with_temperature(self.temperature);

        let verdict = match self.completion.complete(request).await {
            Ok(response) => extract_decision::<CriticVerdict>(&response)
                .unwrap_or_else(|| Self::heuristic(&state.last_output)),
            Err(e) => {
                warn!("critic completion failed, using heuristic: {e}");
                Self::heuristic(&state.last_output)
            }
        };

        let feedback = verdict.feedback.unwrap_or_else(|| "Evaluating...".into());
        debug!(is_error = verdict.is_error, "outcome judged");

        if !verdict.is_error {
            return StateUpdate {
                status: Some(Status::Building),
                error_streak: Some(0),
                rationale: Some(feedback.clone()),
                log_entries: vec![format!("CRITIQUE: {feedback}")],
                ..Default::default()
            };
        }

        let streak = state.error_streak + 1;
        if streak >= self.error_streak_limit {
            warn!(streak, "error streak limit reached, aborting run");
            return StateUpdate {
                status: Some(Status::Finished),
                final_response: Some(GIVING_UP_RESPONSE.into()),
                error_streak: Some(streak),
                log_entries: vec!["CRITIQUE: error limit reached, aborting.".into()],
                ..Default::default()
            };
        }

        StateUpdate {
            status: Some(Status::ErrorRecovery),
            error_streak: Some(streak),
            rationale: Some(feedback.clone()),
            log_entries: vec![format!("CRITIQUE: {feedback}")],
            ..Default::default()
        }
    }

    /// Fallback verdict when the model answer is unusable: flag outputs
    /// that look like stack traces or error messages.
    fn heuristic(output: &str) -> CriticVerdict {
        let lower = output.to_lowercase();
        CriticVerdict {
            is_error: lower.contains("error") || lower.contains("exception"),
            feedback: Some(
                "Could not parse the critique; judged heuristically from the output text."
                    .into(),
            ),
        }
    }
}
