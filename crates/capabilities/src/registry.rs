//! The capability registry: the [`CapabilityProvider`] the control loop
//! talks to.
//!
//! Unknown names and schema-validation mismatches come back as reported
//! failures (`Ok` with `success: false`) so the loop can show the text
//! to the critic and planner; `Err` stays reserved for faults inside
//! capability execution itself.

use async_trait::async_trait;
use onager_core::error::CapabilityError;
use onager_core::{Capability, CapabilityOutcome, CapabilityProvider, CapabilitySpec};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::schema::validate_arguments;

#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Box<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability. A later registration under the same name
    /// replaces the earlier one.
    pub fn register(&mut self, capability: Box<dyn Capability>) {
        self.capabilities
            .insert(capability.name().to_string(), capability);
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }
}

#[async_trait]
impl CapabilityProvider for CapabilityRegistry {
    fn specs(&self) -> Vec<CapabilitySpec> {
        let mut specs: Vec<_> = self.capabilities.values().map(|c| c.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    async fn execute(
        &self,
        name: &str,
        arguments: &Value,
    ) -> Result<CapabilityOutcome, CapabilityError> {
        let Some(capability) = self.capabilities.get(name) else {
            return Ok(CapabilityOutcome::failure(format!(
                "Capability '{name}' not found. Check the available capability list."
            )));
        };

        let arguments = match validate_arguments(&capability.parameters_schema(), arguments) {
            Ok(coerced) => coerced,
            Err(reason) => {
                return Ok(CapabilityOutcome::failure(format!(
                    "Invalid arguments for '{name}': {reason}"
                )));
            }
        };

        debug!(capability = name, "executing capability");
        capability.execute(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Uppercase;

    #[async_trait]
    impl Capability for Uppercase {
        fn name(&self) -> &str {
            "uppercase"
        }

        fn description(&self) -> &str {
            "Uppercase a string."
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string"},
                    "repeat": {"type": "integer"}
                },
                "required": ["text"]
            })
        }

        async fn execute(&self, arguments: Value) -> Result<CapabilityOutcome, CapabilityError> {
            let text = arguments["text"].as_str().unwrap_or_default();
            let repeat = arguments["repeat"].as_i64().unwrap_or(1) as usize;
            Ok(CapabilityOutcome::ok(text.to_uppercase().repeat(repeat)))
        }
    }

    fn registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        registry.register(Box::new(Uppercase));
        registry
    }

    #[tokio::test]
    async fn executes_registered_capability() {
        let outcome = registry()
            .execute("uppercase", &json!({"text": "hi"}))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.output, "HI");
    }

    #[tokio::test]
    async fn unknown_name_is_a_reported_failure() {
        let outcome = registry().execute("teleport", &json!({})).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.output.contains("'teleport' not found"));
    }

    #[tokio::test]
    async fn invalid_arguments_are_a_reported_failure() {
        let outcome = registry().execute("uppercase", &json!({})).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.output.contains("missing required argument 'text'"));
    }

    #[tokio::test]
    async fn arguments_are_coerced_before_execution() {
        let outcome = registry()
            .execute("uppercase", &json!({"text": "ab", "repeat": "2"}))
            .await
            .unwrap();
        assert_eq!(outcome.output, "ABAB");
    }

    #[test]
    fn specs_are_sorted_by_name() {
        let mut registry = registry();
        registry.register(Box::new(Uppercase));
        let specs = registry.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "uppercase");
    }
}
