//! Scripted mock collaborators for loop and role tests.

use async_trait::async_trait;
use onager_core::error::{CapabilityError, CompletionError, MemoryError};
use onager_core::{
    CapabilityOutcome, CapabilityProvider, CapabilitySpec, CompletionRequest, CompletionService,
    MemoryService,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// A completion service that replays a scripted sequence of results,
/// recording every request it receives.
pub struct SequentialMockCompletion {
    results: Mutex<Vec<Result<String, CompletionError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl SequentialMockCompletion {
    pub fn new(responses: Vec<&str>) -> Self {
        Self::with_results(responses.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn single(response: &str) -> Self {
        Self::new(vec![response])
    }

    pub fn with_results(results: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            results: Mutex::new(results),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for SequentialMockCompletion {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        self.requests.lock().unwrap().push(request);
        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            return Err(CompletionError::NotConfigured(
                "mock script exhausted".into(),
            ));
        }
        results.remove(0)
    }
}

/// A capability provider with canned outcomes per capability name,
/// recording every call.
#[derive(Default)]
pub struct StaticCapabilities {
    specs: Vec<CapabilitySpec>,
    outcomes: HashMap<String, CapabilityOutcome>,
    faults: HashMap<String, CapabilityError>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl StaticCapabilities {
    pub fn with_spec(mut self, name: &str, description: &str) -> Self {
        self.specs.push(CapabilitySpec {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({"type": "object"}),
        });
        self
    }

    pub fn with_outcome(mut self, name: &str, outcome: CapabilityOutcome) -> Self {
        self.outcomes.insert(name.into(), outcome);
        self
    }

    pub fn with_fault(mut self, name: &str, fault: CapabilityError) -> Self {
        self.faults.insert(name.into(), fault);
        self
    }

    /// Every (name, arguments) pair executed so far.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CapabilityProvider for StaticCapabilities {
    fn specs(&self) -> Vec<CapabilitySpec> {
        self.specs.clone()
    }

    async fn execute(
        &self,
        name: &str,
        arguments: &Value,
    ) -> Result<CapabilityOutcome, CapabilityError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        if let Some(fault) = self.faults.get(name) {
            return Err(clone_fault(fault));
        }
        match self.outcomes.get(name) {
            Some(outcome) => Ok(outcome.clone()),
            None => Ok(CapabilityOutcome::failure(format!(
                "Capability '{name}' not found."
            ))),
        }
    }
}

// CapabilityError is not Clone; rebuild the variants the mocks use.
fn clone_fault(fault: &CapabilityError) -> CapabilityError {
    match fault {
        CapabilityError::NotFound(name) => CapabilityError::NotFound(name.clone()),
        CapabilityError::ExecutionFailed { name, reason } => CapabilityError::ExecutionFailed {
            name: name.clone(),
            reason: reason.clone(),
        },
        CapabilityError::Timeout { name, timeout_secs } => CapabilityError::Timeout {
            name: name.clone(),
            timeout_secs: *timeout_secs,
        },
        CapabilityError::PermissionDenied { name, reason } => CapabilityError::PermissionDenied {
            name: name.clone(),
            reason: reason.clone(),
        },
        CapabilityError::InvalidArguments(msg) => CapabilityError::InvalidArguments(msg.clone()),
    }
}

/// A memory service that always returns the same context block.
pub struct StaticMemory {
    context: String,
}

impl StaticMemory {
    pub fn new(context: &str) -> Self {
        Self { context: context.into() }
    }

    pub fn empty() -> Self {
        Self::new("")
    }
}

#[async_trait]
impl MemoryService for StaticMemory {
    fn name(&self) -> &str {
        "static"
    }

    async fn retrieve(&self, _query: &str, _k: usize) -> Result<String, MemoryError> {
        Ok(self.context.clone())
    }

    async fn store(&self, _content: &str) -> Result<(), MemoryError> {
        Ok(())
    }
}
