//! Deterministic fallback mutation, used when the mutation service is down
//! or its output is rejected.

/// Make a single, non-semantic change to the trailing punctuation.
///
/// - ends with `.` → the period is dropped
/// - ends with `!` → replaced with `.`
/// - otherwise → a period is appended
///
/// Applying it twice returns to the original for text ending in `.`, so a
/// daily run alternates between two equivalent versions.
pub fn fallback_mutation(text: &str) -> String {
    let trimmed = text.trim_end();
    if let Some(stripped) = trimmed.strip_suffix('.') {
        stripped.to_string()
    } else if let Some(stripped) = trimmed.strip_suffix('!') {
        format!("{}.", stripped)
    } else {
        format!("{}.", trimmed)
    }
}
