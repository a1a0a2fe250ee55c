//! Lenient JSON extraction and the strict response schema.
//!
//! Model replies are rarely bare JSON. Extraction tries, in order:
//!
//! | Shape                          | Recovery                                  |
//! |--------------------------------|-------------------------------------------|
//! | bare JSON                      | parsed as-is                              |
//! | fenced in ```` ```json ````    | fence body parsed                         |
//! | prose before/after the object  | brace-matched slice from the first `{`    |
//! | truncated mid-object           | missing `"`, `]` and `}` appended         |
//!
//! Whatever comes out is then decoded into [`FixResponse`] or
//! [`GeneratedApp`]; a shape mismatch is an error, never a partial result.

use forge_core::SourceFile;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LlmError, LlmResult};

/// Reply to a fix request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixResponse {
    pub files: Vec<SourceFile>,
    #[serde(default, alias = "fixesApplied")]
    pub fixes_applied: Vec<String>,
}

/// Reply to a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedApp {
    pub files: Vec<SourceFile>,
    #[serde(alias = "bundleId")]
    pub bundle_id: String,
    #[serde(alias = "appName")]
    pub app_name: String,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Decode a fix reply. Fails when no JSON object can be recovered, when it
/// lacks `files`, or when `files` is empty.
pub fn parse_fix_response(text: &str) -> LlmResult<FixResponse> {
    let response: FixResponse = decode(text)?;
    validate_files(&response.files)?;
    Ok(response)
}

/// Decode a generation reply.
pub fn parse_generated_app(text: &str) -> LlmResult<GeneratedApp> {
    let app: GeneratedApp = decode(text)?;
    validate_files(&app.files)?;
    if app.bundle_id.trim().is_empty() {
        return Err(LlmError::Schema("empty bundle_id".to_string()));
    }
    Ok(app)
}

fn decode<T: DeserializeOwned>(text: &str) -> LlmResult<T> {
    let value = extract_json(text)
        .ok_or_else(|| LlmError::InvalidResponse("no JSON object found in reply".to_string()))?;
    if !value.is_object() {
        return Err(LlmError::Schema("top-level value is not an object".to_string()));
    }
    serde_json::from_value(value).map_err(|e| LlmError::Schema(e.to_string()))
}

fn validate_files(files: &[SourceFile]) -> LlmResult<()> {
    if files.is_empty() {
        return Err(LlmError::Schema("`files` is empty".to_string()));
    }
    if let Some(file) = files.iter().find(|f| f.path.trim().is_empty()) {
        return Err(LlmError::Schema(format!(
            "file with empty path ({} bytes of content)",
            file.content.len()
        )));
    }
    Ok(())
}

/// Recover a JSON value from a model reply.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    if let Some(body) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str(body.trim()) {
            return Some(value);
        }
    }

    let start = trimmed.find('{')?;
    let candidate = &trimmed[start..];
    match balanced_object(candidate) {
        Some(end) => serde_json::from_str(&candidate[..end]).ok(),
        None => serde_json::from_str(&repair_truncated(candidate)).ok(),
    }
}

/// Body of the first markdown code fence.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    // Skip the info string (e.g. "json")
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let close = body.find("```").unwrap_or(body.len());
    Some(&body[..close])
}

/// Byte offset just past the `}` that closes the object starting at
/// `text[0]`, or `None` if the text ends first.
fn balanced_object(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Close whatever the truncated text left open.
fn repair_truncated(text: &str) -> String {
    let mut closers = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                closers.pop();
            }
            _ => {}
        }
    }

    let mut repaired = text.to_string();
    if in_string {
        if escaped {
            repaired.pop();
        }
        repaired.push('"');
    }

    // A dangling separator or key would still be invalid once closed
    let keep = repaired.trim_end().trim_end_matches(',').len();
    repaired.truncate(keep);
    if repaired.ends_with(':') {
        repaired.push_str("null");
    }

    repaired.extend(closers.iter().rev());
    repaired
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIX: &str = r#"{"files":[{"path":"Todo/ContentView.swift","content":"import SwiftUI\nstruct ContentView: View { var body: some View { Text(\"Hi\") } }"}],"fixes_applied":["closed string literal"]}"#;

    #[test]
    fn test_direct_json() {
        let response = parse_fix_response(FIX).unwrap();
        assert_eq!(response.files.len(), 1);
        assert_eq!(response.fixes_applied, vec!["closed string literal"]);
    }

    #[test]
    fn test_fenced_json() {
        let reply = format!("Here is the fix:\n```json\n{}\n```\nLet me know!", FIX);
        let response = parse_fix_response(&reply).unwrap();
        assert_eq!(response.files[0].path, "Todo/ContentView.swift");
    }

    #[test]
    fn test_prose_prefixed_json() {
        let reply = format!("I fixed the string literal. {} Hope that helps {{:", FIX);
        let response = parse_fix_response(&reply).unwrap();
        assert!(response.files[0].content.contains("Text(\"Hi\")"));
    }

    #[test]
    fn test_truncated_json_missing_two_braces() {
        // Cut off before the closing `}` of the second file, the `]` and
        // the outer `}`
        let reply = r#"{"files":[{"path":"A.swift","content":"import SwiftUI\nstruct A { }"},{"path":"B.swift","content":"struct B { let x = 1 }""#;
        assert!(serde_json::from_str::<Value>(reply).is_err());

        let response = parse_fix_response(reply).unwrap();
        assert_eq!(response.files.len(), 2);
        assert_eq!(response.files[1].path, "B.swift");
        assert!(response.fixes_applied.is_empty());
    }

    #[test]
    fn test_truncated_inside_string() {
        let reply = r#"{"files":[{"path":"A.swift","content":"struct A { let name = \"x"#;
        let value = extract_json(reply).unwrap();
        assert_eq!(value["files"][0]["path"], "A.swift");
    }

    #[test]
    fn test_truncated_after_comma() {
        let reply = r#"{"files":[{"path":"A.swift","content":"struct A {}"},"#;
        let response = parse_fix_response(reply).unwrap();
        assert_eq!(response.files.len(), 1);
    }

    #[test]
    fn test_missing_files_is_schema_error() {
        let err = parse_fix_response(r#"{"fixes_applied": ["none"]}"#).unwrap_err();
        assert!(matches!(err, LlmError::Schema(_)));
    }

    #[test]
    fn test_empty_files_is_schema_error() {
        let err = parse_fix_response(r#"{"files": [], "fixes_applied": []}"#).unwrap_err();
        assert!(matches!(err, LlmError::Schema(_)));
    }

    #[test]
    fn test_no_json_is_invalid_response() {
        let err = parse_fix_response("Sorry, I cannot help with that.").unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_wrong_shape_is_schema_error() {
        let err = parse_fix_response(r#"{"files": [{"name": "A.swift"}]}"#).unwrap_err();
        assert!(matches!(err, LlmError::Schema(_)));
    }

    #[test]
    fn test_generated_app_camel_case() {
        let reply = r#"{"files":[{"path":"App.swift","content":"@main struct App {}"}],"bundleId":"com.example.todo","appName":"Todo","features":["list"]}"#;
        let app = parse_generated_app(reply).unwrap();
        assert_eq!(app.bundle_id, "com.example.todo");
        assert_eq!(app.app_name, "Todo");
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let text = r#"{"a": "}{", "b": [1, 2]} trailing"#;
        assert_eq!(balanced_object(text), Some(text.len() - " trailing".len()));
    }
}
