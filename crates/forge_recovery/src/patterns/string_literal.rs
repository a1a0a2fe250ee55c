//! StringLiteral fixer.
//!
//! | Pre-condition                                              | Post-condition                                   |
//! |------------------------------------------------------------|--------------------------------------------------|
//! | line opens a string it never closes, in a string-bearing   | closing `"` inserted before the call's trailing  |
//! | position (`= "`, `("`, `, "`, `: "`, `return "`)           | `)` run, or at end of line                       |
//! | line has `\"` but no unescaped `"` (double-escaped source) | every `\"` replaced by `"`                       |
//! | more `{` than `}`                                          | deficit of `}` appended                          |
//! | none of the above                                          | unchanged (`None`)                               |
//!
//! Comment lines and multi-line (`"""`) literals are never touched.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::RecoveryResult;
use crate::patterns::braces;
use crate::patterns::scan::is_comment_line;

fn string_bearing_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:=|\(|,|:|\+|\[|\breturn|\bcase)\s*$").expect("string-bearing regex is valid")
    })
}

pub fn fix(content: &str, _errors: &[String]) -> RecoveryResult<Option<String>> {
    let mut changed = false;
    let mut in_multiline = false;
    let mut lines = Vec::new();

    for line in content.split('\n') {
        let triple_quotes = line.matches("\"\"\"").count();
        if triple_quotes > 0 || in_multiline || is_comment_line(line) {
            if triple_quotes % 2 == 1 {
                in_multiline = !in_multiline;
            }
            lines.push(line.to_string());
            continue;
        }

        let mut repaired = unescape_stray_quotes(line).unwrap_or_else(|| line.to_string());
        if let Some(closed) = close_unterminated(&repaired) {
            repaired = closed;
        }
        if repaired != line {
            changed = true;
        }
        lines.push(repaired);
    }

    let mut result = lines.join("\n");
    if let Some(balanced) = braces::balance(&result) {
        result = balanced;
        changed = true;
    }

    Ok(changed.then_some(result))
}

/// `Text(\"Hi\")` → `Text("Hi")`, only when the line has no real literal.
fn unescape_stray_quotes(line: &str) -> Option<String> {
    if !line.contains("\\\"") {
        return None;
    }
    let mut prev = '\0';
    for c in line.chars() {
        if c == '"' && prev != '\\' {
            return None;
        }
        prev = c;
    }
    Some(line.replace("\\\"", "\""))
}

/// Byte offset of the quote opening a literal that runs off the end of
/// the line, ignoring anything after a `//` comment.
fn unterminated_quote(line: &str) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;
    let mut open_at = None;
    let mut chars = line.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '/' if matches!(chars.peek(), Some((_, '/'))) => break,
            '"' => {
                in_string = true;
                open_at = Some(i);
            }
            _ => {}
        }
    }

    if in_string {
        open_at
    } else {
        None
    }
}

/// Open parentheses in `code` outside string literals.
fn unclosed_parens(code: &str) -> usize {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for c in code.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}

fn close_unterminated(line: &str) -> Option<String> {
    let quote = unterminated_quote(line)?;
    let prefix = &line[..quote];
    if !string_bearing_regex().is_match(prefix) {
        return None;
    }

    let body = &line[quote + 1..];
    // Leave a trailing `{`, `}` or whitespace run after the literal
    let suffix_start = body
        .trim_end_matches(|c: char| c.is_whitespace() || c == '{' || c == '}')
        .len();
    let core = &body[..suffix_start];
    let trailing_parens = core.len() - core.trim_end_matches(')').len();
    let insert_at = suffix_start - trailing_parens.min(unclosed_parens(prefix));

    Some(format!(
        "{}\"{}\"{}",
        prefix,
        &body[..insert_at],
        &body[insert_at..]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(content: &str) -> Option<String> {
        fix(content, &[]).unwrap()
    }

    #[test]
    fn test_text_in_button_action() {
        let content = r#"import SwiftUI

struct ContentView: View {
    var body: some View {
        Button(action: {
            print("tapped")
        }) {
            Text("Hello)
        }
    }
}
"#;
        let fixed = run(content).unwrap();
        assert!(fixed.contains(r#"            Text("Hello")"#));
        assert_eq!(
            crate::patterns::scan::brace_counts(&fixed),
            crate::patterns::scan::brace_counts(content)
        );
    }

    #[test]
    fn test_closes_before_trailing_closure_brace() {
        let fixed = run(r#"Button("Tap") { print("Hello) }"#).unwrap();
        assert_eq!(fixed, r#"Button("Tap") { print("Hello") }"#);
    }

    #[test]
    fn test_assignment_closed_at_end() {
        let fixed = run("let title = \"Groceries\nlet x = 1\n").unwrap();
        assert!(fixed.starts_with("let title = \"Groceries\"\n"));
    }

    #[test]
    fn test_double_escaped_line() {
        let fixed = run("        Text(\\\"Welcome\\\")\n").unwrap();
        assert_eq!(fixed, "        Text(\"Welcome\")\n");
    }

    #[test]
    fn test_comments_and_multiline_untouched() {
        let content = "// Don't \"quote\nlet s = \"\"\"\nhe said \"hi\n\"\"\"\n";
        assert!(run(content).is_none());
    }

    #[test]
    fn test_non_string_position_untouched() {
        // A lone quote after an identifier is not a recognizable literal
        assert!(run("let x = y\"abc\n").is_none());
    }

    #[test]
    fn test_idempotent() {
        let content = "struct V: View {\n    var body: some View {\n        Text(\"Hello, \\(name))\n";
        let once = run(content).unwrap();
        assert!(once.contains(r#"Text("Hello, \(name)")"#));
        assert!(run(&once).is_none());
        assert!(once.len() >= content.len());
    }

    #[test]
    fn test_balances_braces() {
        let fixed = run("struct A {\n    let s = \"ok\"\n").unwrap();
        assert!(fixed.ends_with("}\n"));
    }
}
