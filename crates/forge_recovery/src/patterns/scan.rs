//! Minimal Swift lexing shared by the fixers: which bytes are code, as
//! opposed to comments or string literal contents.

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    LineComment,
    BlockComment,
    Str,
    MultilineStr,
}

/// One flag per byte of `content`: `true` where the byte is code.
///
/// Single-line string literals end at the newline even when unterminated,
/// so one broken literal cannot swallow the rest of the file.
pub fn code_mask(content: &str) -> Vec<bool> {
    let bytes = content.as_bytes();
    let mut mask = vec![false; bytes.len()];
    let mut mode = Mode::Code;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match mode {
            Mode::Code => {
                if bytes[i..].starts_with(b"//") {
                    mode = Mode::LineComment;
                    i += 2;
                    continue;
                }
                if bytes[i..].starts_with(b"/*") {
                    mode = Mode::BlockComment;
                    i += 2;
                    continue;
                }
                if bytes[i..].starts_with(b"\"\"\"") {
                    mode = Mode::MultilineStr;
                    i += 3;
                    continue;
                }
                if b == b'"' {
                    mode = Mode::Str;
                } else {
                    mask[i] = true;
                }
            }
            Mode::LineComment => {
                if b == b'\n' {
                    mode = Mode::Code;
                    mask[i] = true;
                }
            }
            Mode::BlockComment => {
                if bytes[i..].starts_with(b"*/") {
                    mode = Mode::Code;
                    i += 2;
                    continue;
                }
            }
            Mode::Str => match b {
                b'\\' => {
                    i += 2;
                    continue;
                }
                b'"' => mode = Mode::Code,
                b'\n' => {
                    mode = Mode::Code;
                    mask[i] = true;
                }
                _ => {}
            },
            Mode::MultilineStr => {
                if b == b'\\' {
                    i += 2;
                    continue;
                }
                if bytes[i..].starts_with(b"\"\"\"") {
                    mode = Mode::Code;
                    i += 3;
                    continue;
                }
            }
        }
        i += 1;
    }

    mask
}

/// Number of `{` and `}` in code positions.
pub fn brace_counts(content: &str) -> (usize, usize) {
    let mask = code_mask(content);
    content
        .bytes()
        .zip(mask)
        .filter(|(_, is_code)| *is_code)
        .fold((0, 0), |(open, close), (b, _)| match b {
            b'{' => (open + 1, close),
            b'}' => (open, close + 1),
            _ => (open, close),
        })
}

/// How many `}` are missing at the end of `content`.
pub fn brace_deficit(content: &str) -> usize {
    let (open, close) = brace_counts(content);
    open.saturating_sub(close)
}

/// Whether a line is entirely a comment.
pub fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*')
}
