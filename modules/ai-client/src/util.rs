//! Helpers for digging JSON out of model responses that wrap it in prose or
//! markdown fences.

/// Extract the JSON payload from a model response. Handles ```json fences,
/// bare fences, and responses with pre/postamble around a single object or
/// array. Returns `None` when nothing JSON-shaped is present.
pub fn extract_json_from_response(response: &str) -> Option<String> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Fenced block first: take the content between the first pair of fences.
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        let after = after.trim_start_matches(['\r', '\n']);
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if !inner.is_empty() {
                return Some(inner.to_string());
            }
        }
    }

    // Already bare JSON.
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed.to_string());
    }

    // Last resort: first balanced-looking object or array slice.
    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if end > start {
                return Some(trimmed[start..=end].to_string());
            }
        }
    }

    None
}
