//! Tolerant extraction of a JSON object from free-form model output
//!
//! Models wrap JSON in markdown fences, preamble text, or trailing prose.
//! Extraction tries, in order: a fenced ```json block, the whole response,
//! and the outermost balanced `{...}` substring. No repair of malformed JSON
//! is attempted beyond trimming fences and whitespace.

/// Extract a JSON object from a model response. Returns `None` when no
/// parseable object is present. Never panics.
pub fn extract_json(response: &str) -> Option<serde_json::Value> {
    if let Some(block) = fenced_json_block(response) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&block) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(response.trim()) {
        if value.is_object() {
            return Some(value);
        }
    }

    let candidate = balanced_object(response)?;
    match serde_json::from_str::<serde_json::Value>(candidate) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Contents of the first ```json (or bare ```) fenced block.
fn fenced_json_block(response: &str) -> Option<String> {
    let mut in_block = false;
    let mut block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();
        if !in_block && (trimmed == "```json" || trimmed == "```") {
            in_block = true;
            block.clear();
        } else if in_block && trimmed == "```" {
            let candidate = block.trim();
            if candidate.starts_with('{') {
                return Some(candidate.to_string());
            }
            in_block = false;
            block.clear();
        } else if in_block {
            block.push_str(line);
            block.push('\n');
        }
    }
    None
}

/// The outermost balanced `{...}` substring, tracking string literals and
/// escapes so braces inside strings do not confuse the count.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block() {
        let response = "Here is the result:\n```json\n{\"answer\": 42}\n```\nDone.";
        let value = extract_json(response).unwrap();
        assert_eq!(value["answer"], 42);
    }

    #[test]
    fn test_bare_fence() {
        let response = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json(response).unwrap()["a"], 1);
    }

    #[test]
    fn test_whole_response_is_json() {
        let value = extract_json("  {\"plan\": []}  ").unwrap();
        assert!(value["plan"].is_array());
    }

    #[test]
    fn test_embedded_object() {
        let response = "Sure! The intent is {\"primary_goal\": \"learn\"} as requested.";
        let value = extract_json(response).unwrap();
        assert_eq!(value["primary_goal"], "learn");
    }

    #[test]
    fn test_braces_inside_strings() {
        let response = "prefix {\"text\": \"a } inside\", \"n\": 1} suffix";
        let value = extract_json(response).unwrap();
        assert_eq!(value["n"], 1);
    }

    #[test]
    fn test_nested_objects() {
        let response = "x {\"outer\": {\"inner\": {\"deep\": true}}} y";
        let value = extract_json(response).unwrap();
        assert_eq!(value["outer"]["inner"]["deep"], true);
    }

    #[test]
    fn test_plain_text_yields_none() {
        assert!(extract_json("I could not produce an answer.").is_none());
    }

    #[test]
    fn test_malformed_json_yields_none() {
        assert!(extract_json("{\"unclosed\": ").is_none());
    }

    #[test]
    fn test_non_object_json_yields_none() {
        assert!(extract_json("[1, 2, 3]").is_none());
        assert!(extract_json("\"just a string\"").is_none());
    }

    #[test]
    fn test_round_trip_for_serialized_objects() {
        let original = serde_json::json!({
            "research_questions": [{"id": "RQ1", "question": "What?"}],
            "nested": {"score": 0.85}
        });
        let encoded = serde_json::to_string(&original).unwrap();
        assert_eq!(extract_json(&encoded).unwrap(), original);
    }
}
