//! JSON extraction from free-form model responses
//!
//! Models wrap their JSON in prose, markdown fences or both. The extractor
//! scans for balanced `{ ... }` objects, tracking string and escape state so
//! that braces inside string values never end an object early.

use serde_json::Value;

/// Extract the first JSON object embedded in `response`.
///
/// Candidates are tried in order of their opening brace. A balanced candidate
/// that does not parse (e.g. `{placeholder}` in surrounding prose) is skipped
/// and the next one is tried. When nothing parses, the whole trimmed text is
/// tried as a last resort.
///
/// On failure, returns the parse error message of the first candidate, or of
/// the whole text if no balanced candidate existed.
pub fn extract_json_object(response: &str) -> Result<Value, String> {
    let trimmed = response.trim();
    let mut first_error: Option<String> = None;

    for (open, close) in brace_pairs(trimmed) {
        match serde_json::from_str::<Value>(&trimmed[open..=close]) {
            Ok(value @ Value::Object(_)) => return Ok(value),
            Ok(_) => {}
            Err(e) => {
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Ok(value),
        Err(e) => Err(first_error.unwrap_or_else(|| e.to_string())),
    }
}

/// Every balanced `{ ... }` span in `s` as `(open, close)` byte offsets,
/// sorted by opening brace.
///
/// One pass with a stack of open positions, so an unclosed brace early in
/// the text does not force a rescan for each later `{`. String state is
/// tracked from the first `{`, so braces inside string values never open a
/// candidate.
fn brace_pairs(s: &str) -> Vec<(usize, usize)> {
    let Some(first) = s.find('{') else {
        return Vec::new();
    };
    let mut open: Vec<usize> = Vec::new();
    let mut pairs = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s[first..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => open.push(first + i),
            '}' if !in_string => {
                if let Some(start) = open.pop() {
                    pairs.push((start, first + i));
                }
            }
            _ => {}
        }
    }
    pairs.sort_unstable_by_key(|&(start, _)| start);
    pairs
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals, to find the
/// matching close brace.
pub fn balanced_object(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
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
    use serde_json::json;

    #[test]
    fn test_bare_object() {
        let value = extract_json_object(r#"  {"title": "x"}  "#).unwrap();
        assert_eq!(value, json!({"title": "x"}));
    }

    #[test]
    fn test_object_in_prose_and_fence() {
        let text = concat!(
            "Sure! Here is the plan:\n",
            "```json\n{\"title\": \"Launch\", \"steps\": []}\n```\n",
            "Let me know."
        );
        let value = extract_json_object(text).unwrap();
        assert_eq!(value, json!({"title": "Launch", "steps": []}));
    }

    #[test]
    fn test_braces_inside_string_values() {
        // A naive first-`}` scan would cut at "{name}"
        let text = concat!(
            r#"Result: {"description": "Fill the {name} field, then close with }", "#,
            r#""n": {"k": 1}} done"#
        );
        let value = extract_json_object(text).unwrap();
        assert_eq!(
            value["description"],
            "Fill the {name} field, then close with }"
        );
        assert_eq!(value["n"]["k"], 1);
    }

    #[test]
    fn test_escaped_quotes_inside_strings() {
        let text = r#"{"task_prompt": "Say \"hi {there}\" loudly"}"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["task_prompt"], "Say \"hi {there}\" loudly");
    }

    #[test]
    fn test_skips_non_json_brace_group() {
        let text = r#"Replace {placeholder} below. {"title": "Real"}"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value, json!({"title": "Real"}));
    }

    #[test]
    fn test_takes_first_of_two_objects() {
        // A greedy `{.*}` match would span both objects and fail to parse
        let text = r#"{"title": "first"} and also {"title": "second"}"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["title"], "first");
    }

    #[test]
    fn test_unbalanced_falls_back_to_whole_text() {
        let err = extract_json_object(r#"{"title": "never closed""#).unwrap_err();
        assert!(!err.is_empty());
    }

    #[test]
    fn test_no_json_at_all() {
        assert!(extract_json_object("I cannot help with that.").is_err());
    }

    #[test]
    fn test_object_after_unclosed_brace() {
        let text = r#"Use the { character sparingly. {"title": "Real"}"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value, json!({"title": "Real"}));
    }

    #[test]
    fn test_many_unclosed_braces() {
        let text = format!("{}{}", "{".repeat(50_000), r#"{"title": "deep"}"#);
        let value = extract_json_object(&text).unwrap();
        assert_eq!(value["title"], "deep");
        assert!(extract_json_object(&"{ ".repeat(50_000)).is_err());
    }

    #[test]
    fn test_brace_pairs_agree_with_balanced_object() {
        let text = r#"a {x} {"k": "}{", "n": {"m": [1, {}]}} {"#;
        let pairs = brace_pairs(text);
        assert_eq!(pairs.len(), 4);
        for (open, close) in pairs {
            assert_eq!(balanced_object(&text[open..]), Some(&text[open..=close]));
        }
    }

    #[test]
    fn test_balanced_object_requires_leading_brace() {
        assert_eq!(balanced_object("x{}"), None);
        assert_eq!(balanced_object("{}tail"), Some("{}"));
        assert_eq!(
            balanced_object("{\"a\": {\"b\": 2}} x"),
            Some("{\"a\": {\"b\": 2}}")
        );
    }
}
