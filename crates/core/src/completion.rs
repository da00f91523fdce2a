//! The completion-service contract.
//!
//! The engine never talks HTTP itself; every reasoning role builds a
//! [`CompletionRequest`] and hands it to whatever [`CompletionService`]
//! was injected at wiring time.

use async_trait::async_trait;

use crate::error::CompletionError;
use crate::message::Message;

/// A single non-streaming completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages, temperature: 0.7, max_tokens: None }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Anything that can turn a list of messages into completion text.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Human-readable service name, for logs.
    fn name(&self) -> &str;

    /// Run one completion and return the raw assistant text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}
