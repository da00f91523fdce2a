//! The capability contract: what an external action looks like to the
//! control loop.
//!
//! Two layers: [`Capability`] is one executable action; a
//! [`CapabilityProvider`] is the registry surface the engine depends on.
//! The engine never sees individual capabilities, only the provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CapabilityError;

/// Description of a capability, exposed to the planner so the model can
/// choose between actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitySpec {
    pub name: String,
    pub description: String,
    /// JSON schema for the arguments object.
    pub parameters: Value,
}

/// Result of executing a capability.
///
/// `success: false` is a *reported* failure (the action ran and told us
/// it went wrong, or its arguments were rejected); an `Err` from
/// `execute` is an execution-level fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityOutcome {
    pub success: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl CapabilityOutcome {
    pub fn ok(output: impl Into<String>) -> Self {
        Self { success: true, output: output.into(), metadata: None }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self { success: false, output: output.into(), metadata: None }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A single executable action.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema describing the arguments object.
    fn parameters_schema(&self) -> Value;

    async fn execute(&self, arguments: Value) -> Result<CapabilityOutcome, CapabilityError>;

    fn spec(&self) -> CapabilitySpec {
        CapabilitySpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The registry surface the engine invokes actions through.
///
/// Contract: unknown names and argument-validation mismatches come back
/// as `Ok` outcomes with `success: false`, so the loop can feed the
/// failure text to the critic. `Err` is reserved for faults in the
/// execution machinery itself.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Specs for every registered capability, for prompt construction.
    fn specs(&self) -> Vec<CapabilitySpec>;

    /// Execute the named capability with the given arguments.
    async fn execute(
        &self,
        name: &str,
        arguments: &Value,
    ) -> Result<CapabilityOutcome, CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_constructors() {
        let ok = CapabilityOutcome::ok("done");
        assert!(ok.success);
        let bad = CapabilityOutcome::failure("nope");
        assert!(!bad.success);
        assert_eq!(bad.output, "nope");
    }

    #[test]
    fn outcome_metadata_is_omitted_when_absent() {
        let json = serde_json::to_string(&CapabilityOutcome::ok("x")).unwrap();
        assert!(!json.contains("metadata"));
    }
}
