//! Shared utility functions used across multiple modules.

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Append every item of `incoming` that `target` does not already hold.
///
/// Keeps the order of `target` and the relative order of the new items.
/// Returns the number of appended items.
pub fn union_into(target: &mut Vec<String>, incoming: Vec<String>) -> usize {
    let before = target.len();
    for item in incoming {
        if !target.contains(&item) {
            target.push(item);
        }
    }
    target.len() - before
}
