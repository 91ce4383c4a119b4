//! Resilient JSON extraction from free-form model output
//!
//! Every model-output consumer in this crate goes through `parse_json_object`.
//! Direct parse first; on failure, scan from the first `{` tracking quoted
//! strings (with backslash escapes) and brace depth, and parse the candidate
//! substring once depth returns to zero. Only plain objects are accepted.

use serde_json::Value;

/// Slice out the first balanced `{...}` region of `text`, if any.
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    let bytes = text.as_bytes();
    for (i, &ch) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == b'\\' {
                escaped = true;
            } else if ch == b'"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Best-effort parse of a JSON object out of arbitrary text.
/// Returns `None` for arrays, primitives, and unrecoverable garbage.
pub fn parse_json_object(raw: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        return if v.is_object() { Some(v) } else { None };
    }

    let extracted = extract_first_json_object(raw)?;
    match serde_json::from_str::<Value>(extracted) {
        Ok(v) if v.is_object() => Some(v),
        _ => None,
    }
}
