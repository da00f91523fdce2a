//! Conversational responder for chat-mode runs.
//!
//! One completion call over a bounded conversation window plus recalled
//! memory context, then straight to the terminal state. A transport
//! error still produces a natural-language final response so the run
//! terminates cleanly.

use onager_core::{CompletionRequest, CompletionService, MemoryService, Message};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::state::{ExecutionState, StateUpdate, Status};

pub struct ChatResponder {
    completion: Arc<dyn CompletionService>,
    memory: Arc<dyn MemoryService>,
    temperature: f32,
    history_window: usize,
    recall_k: usize,
}

impl ChatResponder {
    pub fn new(completion: Arc<dyn CompletionService>, memory: Arc<dyn MemoryService>) -> Self {
        Self {
            completion,
            memory,
            temperature: 0.7,
            history_window: 10,
            recall_k: 5,
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

    pub fn with_recall_k(mut self, k: usize) -> Self {
        self.recall_k = k;
        self
    }

    /// Produce the conversational reply and finish the run.
    pub async fn respond(&self, state: &ExecutionState) -> StateUpdate {
        let memory_context = match self.memory.retrieve(&state.objective, self.recall_k).await {
            Ok(context) => context,
            Err(e) => {
                warn!("memory recall failed for chat response: {e}");
                String::new()
            }
        };

        let system = format!(
            "You are Onager, an autonomous assistant.\n\
             GUIDELINES:\n\
             - Be direct and technical. Avoid redundancy.\n\
             - Use the memory context below to maintain continuity.\n\
             - Only use the context if it is relevant to the question.\n\n\
             MEMORY CONTEXT:\n{memory_context}"
        );

        let mut messages = vec![Message::system(system)];
        messages.extend(state.recent_conversation(self.history_window).iter().cloned());

        let request =
            CompletionRequest::new(messages).with_temperature(self.temperature);

        let response = match self.completion.complete(request).await {
            Ok(text) => text,
            Err(e) => {
                warn!("chat completion failed: {e}");
                format!(
                    "I hit a problem reaching the language model ({e}). \
                     Please try again in a moment."
                )
            }
        };

        debug!(chars = response.len(), "chat response produced");

        let preview: String = response.chars().take(100).collect();
        StateUpdate {
            status: Some(Status::Finished),
            final_response: Some(response),
            log_entries: vec![format!("CHAT_RESPONSE: {preview}...")],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{SequentialMockCompletion, StaticMemory};
    use onager_core::error::CompletionError;

    #[tokio::test]
    async fn finishes_with_response() {
        let mock = Arc::new(SequentialMockCompletion::single("Hello! How can I help?"));
        let responder = ChatResponder::new(mock, Arc::new(StaticMemory::empty()));

        let update = responder.respond(&ExecutionState::new("hi")).await;
        assert_eq!(update.status, Some(Status::Finished));
        assert_eq!(update.final_response.as_deref(), Some("Hello! How can I help?"));
        assert!(update.log_entries[0].starts_with("CHAT_RESPONSE:"));
    }

    #[tokio::test]
    async fn memory_context_reaches_the_prompt() {
        let mock = Arc::new(SequentialMockCompletion::single("ok"));
        let responder = ChatResponder::new(
            mock.clone(),
            Arc::new(StaticMemory::new("- the user prefers metric units")),
        );

        responder.respond(&ExecutionState::new("how tall is Everest?")).await;

        let requests = mock.requests();
        let system = &requests[0].messages[0].content;
        assert!(system.contains("the user prefers metric units"));
    }

    #[tokio::test]
    async fn history_window_is_bounded() {
        let mock = Arc::new(SequentialMockCompletion::single("ok"));
        let responder = ChatResponder::new(mock.clone(), Arc::new(StaticMemory::empty()))
            .with_history_window(4);

        let mut history = Vec::new();
        for i in 0..20 {
            history.push(Message::user(format!("msg {i}")));
        }
        let state = ExecutionState::with_history("latest", history);
        responder.respond(&state).await;

        // system message + 4-message window
        let requests = mock.requests();
        assert_eq!(requests[0].messages.len(), 5);
        assert_eq!(requests[0].messages.last().unwrap().content, "latest");
    }

    #[tokio::test]
    async fn transport_error_still_finishes() {
        let mock = Arc::new(SequentialMockCompletion::with_results(vec![Err(
            CompletionError::Timeout("30s elapsed".into()),
        )]));
        let responder = ChatResponder::new(mock, Arc::new(StaticMemory::empty()));

        let update = responder.respond(&ExecutionState::new("hi")).await;
        assert_eq!(update.status, Some(Status::Finished));
        let response = update.final_response.unwrap();
        assert!(response.contains("try again"));
    }
}
