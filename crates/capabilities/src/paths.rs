//! Path validation shared by the file capabilities.

/// Check a path against the forbidden-prefix list.
///
/// Rejects parent-directory traversal outright, then matches the path
/// against each forbidden prefix (with a leading `~` expanded to the
/// home directory). Returns the rejection reason on a match.
pub fn validate_path(path: &str, forbidden: &[String]) -> Result<(), String> {
    if path.split(['/', '\\']).any(|part| part == "..") {
        return Err("path traversal ('..') is not allowed".into());
    }

    let home = std::env::var("HOME").unwrap_or_default();
    for prefix in forbidden {
        let expanded = if let Some(rest) = prefix.strip_prefix('~') {
            format!("{home}{rest}")
        } else {
            prefix.clone()
        };
        if !expanded.is_empty() && path.starts_with(&expanded) {
            return Err(format!("path is under forbidden prefix '{prefix}'"));
        }
    }

    Ok(())
}
