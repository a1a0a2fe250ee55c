//! Brace-balance repair, the whole of the Syntax fixer.
//!
//! | Pre-condition                        | Post-condition                          |
//! |--------------------------------------|-----------------------------------------|
//! | more `{` than `}` in code positions  | deficit of `}` appended at end of file  |
//! | balanced, or surplus `}`             | unchanged (`None`)                      |
//!
//! Content is only ever appended to.

use crate::error::RecoveryResult;
use crate::patterns::scan::brace_deficit;

pub fn fix(content: &str, _errors: &[String]) -> RecoveryResult<Option<String>> {
    Ok(balance(content))
}

/// `content` with missing closing braces appended, or `None` if balanced.
pub fn balance(content: &str) -> Option<String> {
    let deficit = brace_deficit(content);
    if deficit == 0 {
        return None;
    }

    let mut fixed = content.to_string();
    if !fixed.is_empty() && !fixed.ends_with('\n') {
        fixed.push('\n');
    }
    for _ in 0..deficit {
        fixed.push_str("}\n");
    }
    Some(fixed)
}
