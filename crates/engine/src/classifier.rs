//! Intent classification: one cheap completion call deciding whether
//! the objective is a conversational exchange or a multi-step task.
//!
//! This role never retries and never blocks a run: any malformed
//! output or transport error fails open to task mode, which at worst
//! costs one planning cycle before the planner replies directly.

use onager_core::{CompletionRequest, CompletionService, Message};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::extract::extract_decision;
use crate::state::{ExecutionState, Mode, StateUpdate};

pub struct IntentClassifier {
    completion: Arc<dyn CompletionService>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ClassifierDecision {
    #[serde(default)]
    thought: Option<String>,
    #[serde(default)]
    mode: Option<String>,
}

const FALLBACK_THOUGHT: &str = "Assessing task complexity...";

impl IntentClassifier {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion, temperature: 0.0 }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Classify the objective. Infallible by policy: failures fail open
    /// to [`Mode::Task`].
    pub async fn classify(&self, state: &ExecutionState) -> StateUpdate {
        let prompt = format!(
            "Analyze the intent of this message: '{}'. \
             Is it casual conversation / a simple question (\"chat\"), or does it \
             require executing actions on the system (\"task\")?\n\
             Respond in JSON: {{\"thought\": \"your analysis\", \"mode\": \"chat\" or \"task\"}}",
            state.objective
        );

        let request = CompletionRequest::new(vec![Message::user(prompt)])
            .with_temperature(self.temperature);

        let response = match self.completion.complete(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!("classifier completion failed, defaulting to task mode: {e}");
                return Self::fallback();
            }
        };

        match extract_decision::<ClassifierDecision>(&response) {
            Some(decision) => {
                let mode = match decision.mode.as_deref() {
                    Some("chat") => Mode::Chat,
                    _ => Mode::Task,
                };
                debug!(?mode, "objective classified");
                StateUpdate {
                    mode: Some(mode),
                    rationale: Some(
                        decision.thought.unwrap_or_else(|| "Classifying intent...".into()),
                    ),
                    ..Default::default()
                }
            }
            None => {
                debug!("classifier output unparseable, defaulting to task mode");
                Self::fallback()
            }
        }
    }

    fn fallback() -> StateUpdate {
        StateUpdate {
            mode: Some(Mode::Task),
            rationale: Some(FALLBACK_THOUGHT.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::SequentialMockCompletion;
    use onager_core::error::CompletionError;

    #[tokio::test]
    async fn classifies_chat() {
        let mock = Arc::new(SequentialMockCompletion::single(
            r#"{"thought": "just a greeting", "mode": "chat"}"#,
        ));
        let classifier = IntentClassifier::new(mock);
        let update = classifier.classify(&ExecutionState::new("hi there")).await;
        assert_eq!(update.mode, Some(Mode::Chat));
        assert_eq!(update.rationale.as_deref(), Some("just a greeting"));
    }

    #[tokio::test]
    async fn classifies_task() {
        let mock = Arc::new(SequentialMockCompletion::single(
            r#"{"thought": "needs shell access", "mode": "task"}"#,
        ));
        let classifier = IntentClassifier::new(mock);
        let update = classifier
            .classify(&ExecutionState::new("free up disk space"))
            .await;
        assert_eq!(update.mode, Some(Mode::Task));
    }

    #[tokio::test]
    async fn garbage_output_fails_open_to_task() {
        let mock = Arc::new(SequentialMockCompletion::single("I can't answer in JSON"));
        let classifier = IntentClassifier::new(mock);
        let update = classifier.classify(&ExecutionState::new("hmm")).await;
        assert_eq!(update.mode, Some(Mode::Task));
        assert_eq!(update.rationale.as_deref(), Some(FALLBACK_THOUGHT));
    }

    #[tokio::test]
    async fn transport_error_fails_open_to_task() {
        let mock = Arc::new(SequentialMockCompletion::with_results(vec![Err(
            CompletionError::Network("connection refused".into()),
        )]));
        let classifier = IntentClassifier::new(mock);
        let update = classifier.classify(&ExecutionState::new("hmm")).await;
        assert_eq!(update.mode, Some(Mode::Task));
    }

    #[tokio::test]
    async fn unknown_mode_string_defaults_to_task() {
        let mock = Arc::new(SequentialMockCompletion::single(
            r#"{"thought": "unsure", "mode": "maybe"}"#,
        ));
        let classifier = IntentClassifier::new(mock);
        let update = classifier.classify(&ExecutionState::new("hmm")).await;
        assert_eq!(update.mode, Some(Mode::Task));
    }
}
