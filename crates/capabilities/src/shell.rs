//! Shell capability — execute system commands.
//!
//! Supports command allowlisting and a per-invocation timeout. Denied
//! commands and timeouts are reported failures, not faults: the planner
//! should see the reason and pick a different approach.

use async_trait::async_trait;
use onager_core::error::CapabilityError;
use onager_core::{Capability, CapabilityOutcome};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

pub struct ShellCapability {
    /// If non-empty, only these commands are allowed.
    allowed_commands: Vec<String>,
    /// Upper bound for one invocation, seconds.
    timeout_secs: u64,
}

impl ShellCapability {
    pub fn new(allowed_commands: Vec<String>) -> Self {
        Self {
            allowed_commands,
            timeout_secs: 60,
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        if self.allowed_commands.is_empty() {
            return true; // No allowlist = all commands allowed
        }

        let base_cmd = command.split_whitespace().next().unwrap_or("").trim();
        self.allowed_commands.iter().any(|a| a == base_cmd)
    }
}

#[async_trait]
impl Capability for ShellCapability {
    fn name(&self) -> &str {
        "shell"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return stdout/stderr. Use this for running programs, checking files, git operations, etc."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> Result<CapabilityOutcome, CapabilityError> {
        let command = arguments["command"].as_str().unwrap_or_default();

        if !self.is_command_allowed(command) {
            return Ok(CapabilityOutcome::failure(format!(
                "Command '{}' is not in the allowlist.",
                command.split_whitespace().next().unwrap_or("")
            )));
        }

        debug!(command = %command, "executing shell command");

        let run = if cfg!(target_os = "windows") {
            Command::new("cmd").args(["/C", command]).output()
        } else {
            Command::new("sh").args(["-c", command]).output()
        };

        let output = match tokio::time::timeout(Duration::from_secs(self.timeout_secs), run).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(CapabilityError::ExecutionFailed {
                    name: "shell".into(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                warn!(command = %command, timeout_secs = self.timeout_secs, "command timed out");
                return Ok(CapabilityOutcome::failure(format!(
                    "Command timed out after {}s.",
                    self.timeout_secs
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let success = output.status.success();

        let result_text = if success {
            if stderr.is_empty() {
                stdout
            } else {
                format!("{stdout}\n[stderr]: {stderr}")
            }
        } else {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %command, exit_code = code, "command failed");
            format!("[exit code: {code}]\n{stdout}\n{stderr}")
        };

        Ok(CapabilityOutcome {
            success,
            output: result_text.trim().to_string(),
            metadata: None,
        })
    }
}
