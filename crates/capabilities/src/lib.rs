//! Built-in capability implementations for Onager.
//!
//! Capabilities give the agent the ability to act on the world: run
//! shell commands and read/write files. The [`registry::CapabilityRegistry`]
//! validates and coerces arguments against each capability's declared
//! schema before invoking it, so capabilities can trust their input shape.

pub mod file_read;
pub mod file_write;
pub mod paths;
pub mod registry;
pub mod schema;
pub mod shell;

use registry::CapabilityRegistry;
use serde_json::Value;
use std::collections::HashMap;

/// Create a registry with all built-in capabilities and default settings.
///
/// Security defaults:
/// - Shell: only common safe commands (ls, cat, echo, git, pwd, etc.)
/// - File read/write: sensitive paths (~/.ssh, /etc/shadow, etc.) are blocked
pub fn default_registry() -> CapabilityRegistry {
    default_registry_with(&HashMap::new())
}

/// Create the default registry applying per-capability settings from
/// configuration, keyed by capability name.
///
/// Recognized settings:
/// - `shell.timeout_secs` — per-invocation timeout override
/// - `shell.allowed_commands` — replaces the default allowlist
pub fn default_registry_with(settings: &HashMap<String, Value>) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    let safe_commands = vec![
        "ls".into(),
        "cat".into(),
        "head".into(),
        "tail".into(),
        "echo".into(),
        "pwd".into(),
        "date".into(),
        "whoami".into(),
        "df".into(),
        "du".into(),
        "wc".into(),
        "grep".into(),
        "find".into(),
        "which".into(),
        "git".into(),
        "cargo".into(),
        "python".into(),
    ];
    let forbidden_paths = vec![
        "/etc".into(),
        "/proc".into(),
        "/sys".into(),
        "~/.ssh".into(),
        "~/.gnupg".into(),
        "~/.aws".into(),
    ];

    let shell_settings = settings.get("shell");
    let allowed = shell_settings
        .and_then(|s| s.get("allowed_commands"))
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect::<Vec<_>>()
        })
        .unwrap_or(safe_commands);
    let mut shell = shell::ShellCapability::new(allowed);
    if let Some(secs) = shell_settings
        .and_then(|s| s.get("timeout_secs"))
        .and_then(Value::as_u64)
    {
        shell = shell.with_timeout_secs(secs);
    }

    registry.register(Box::new(shell));
    registry.register(Box::new(file_read::FileReadCapability::with_restrictions(
        forbidden_paths.clone(),
    )));
    registry.register(Box::new(file_write::FileWriteCapability::with_restrictions(
        forbidden_paths,
    )));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use onager_core::CapabilityProvider;
    use serde_json::json;

    #[tokio::test]
    async fn settings_override_the_shell_allowlist() {
        let mut settings = HashMap::new();
        settings.insert("shell".to_string(), json!({"allowed_commands": ["date"]}));
        let registry = default_registry_with(&settings);

        let outcome = registry
            .execute("shell", &json!({"command": "echo hi"}))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.output.contains("allowlist"));

        let outcome = registry
            .execute("shell", &json!({"command": "date"}))
            .await
            .unwrap();
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn settings_override_the_shell_timeout() {
        // A zero-second budget elapses before any process can finish.
        let mut settings = HashMap::new();
        settings.insert("shell".to_string(), json!({"timeout_secs": 0}));
        let registry = default_registry_with(&settings);

        let outcome = registry
            .execute("shell", &json!({"command": "echo never"}))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.output.contains("timed out"));
    }

    #[tokio::test]
    async fn empty_settings_give_the_defaults() {
        let registry = default_registry_with(&HashMap::new());
        let outcome = registry
            .execute("shell", &json!({"command": "echo default"}))
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(outcome.output.contains("default"));
    }
}
