//! File read capability — read file contents with path validation.

use async_trait::async_trait;
use onager_core::error::CapabilityError;
use onager_core::{Capability, CapabilityOutcome};

use crate::paths::validate_path;

pub struct FileReadCapability {
    /// Forbidden path prefixes.
    forbidden_paths: Vec<String>,
}

impl FileReadCapability {
    /// Create a file read capability with no path restrictions.
    pub fn new() -> Self {
        Self { forbidden_paths: Vec::new() }
    }

    /// Create a file read capability with path restrictions.
    pub fn with_restrictions(forbidden_paths: Vec<String>) -> Self {
        Self { forbidden_paths }
    }
}

impl Default for FileReadCapability {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Capability for FileReadCapability {
    fn name(&self) -> &str {
        "file_read"
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the given path."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> Result<CapabilityOutcome, CapabilityError> {
        let path = arguments["path"].as_str().unwrap_or_default();

        if let Err(reason) = validate_path(path, &self.forbidden_paths) {
            return Ok(CapabilityOutcome::failure(format!(
                "Refusing to read '{path}': {reason}"
            )));
        }

        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(CapabilityOutcome::ok(content)),
            Err(e) => Ok(CapabilityOutcome::failure(format!(
                "Failed to read file: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn capability_definition() {
        let cap = FileReadCapability::new();
        assert_eq!(cap.name(), "file_read");
        let schema = cap.parameters_schema();
        assert_eq!(schema["required"], serde_json::json!(["path"]));
        assert!(schema["properties"]["path"].is_object());
    }

    #[tokio::test]
    async fn read_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("test.txt");
        let mut f = std::fs::File::create(&file_path).unwrap();
        writeln!(f, "Hello, world!").unwrap();

        let cap = FileReadCapability::new();
        let outcome = cap
            .execute(serde_json::json!({"path": file_path.to_str().unwrap()}))
            .await
            .unwrap();

        assert!(outcome.success);
        assert!(outcome.output.contains("Hello, world!"));
    }

    #[tokio::test]
    async fn read_nonexistent_file() {
        let cap = FileReadCapability::new();
        let outcome = cap
            .execute(serde_json::json!({"path": "/tmp/onager_test_nonexistent_12345.txt"}))
            .await
            .unwrap();

        assert!(!outcome.success);
        assert!(outcome.output.contains("Failed to read file"));
    }

    #[tokio::test]
    async fn path_traversal_blocked() {
        let cap = FileReadCapability::with_restrictions(vec![]);
        let outcome = cap
            .execute(serde_json::json!({"path": "../../../etc/passwd"}))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.output.contains("Refusing to read"));
    }

    #[tokio::test]
    async fn forbidden_path_blocked() {
        let cap = FileReadCapability::with_restrictions(vec!["/etc".into()]);
        let outcome = cap
            .execute(serde_json::json!({"path": "/etc/shadow"}))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.output.contains("forbidden"));
    }
}
