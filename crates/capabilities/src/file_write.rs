//! File write capability — write or append file contents with path
//! validation.

use async_trait::async_trait;
use onager_core::error::CapabilityError;
use onager_core::{Capability, CapabilityOutcome};
use std::path::Path;

use crate::paths::validate_path;

pub struct FileWriteCapability {
    /// Forbidden path prefixes.
    forbidden_paths: Vec<String>,
}

impl FileWriteCapability {
    /// Create a file write capability with no path restrictions.
    pub fn new() -> Self {
        Self { forbidden_paths: Vec::new() }
    }

    /// Create a file write capability with path restrictions.
    pub fn with_restrictions(forbidden_paths: Vec<String>) -> Self {
        Self { forbidden_paths }
    }
}

impl Default for FileWriteCapability {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Capability for FileWriteCapability {
    fn name(&self) -> &str {
        "file_write"
    }

    fn description(&self) -> &str {
        "Write content to a file at the given path, creating parent directories as needed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to write"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                },
                "append": {
                    "type": "boolean",
                    "description": "Append instead of overwriting (default false)"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> Result<CapabilityOutcome, CapabilityError> {
        let path = arguments["path"].as_str().unwrap_or_default();
        let content = arguments["content"].as_str().unwrap_or_default();
        let append = arguments["append"].as_bool().unwrap_or(false);

        if let Err(reason) = validate_path(path, &self.forbidden_paths) {
            return Ok(CapabilityOutcome::failure(format!(
                "Refusing to write '{path}': {reason}"
            )));
        }

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    return Ok(CapabilityOutcome::failure(format!(
                        "Failed to create parent directories: {e}"
                    )));
                }
            }
        }

        let result = if append {
            let existing = tokio::fs::read_to_string(path).await.unwrap_or_default();
            tokio::fs::write(path, format!("{existing}{content}")).await
        } else {
            tokio::fs::write(path, content).await
        };

        match result {
            Ok(()) => Ok(CapabilityOutcome::ok(format!(
                "Wrote {} bytes to {path}",
                content.len()
            ))),
            Err(e) => Ok(CapabilityOutcome::failure(format!(
                "Failed to write file: {e}"
            ))),
        }
    }
}
