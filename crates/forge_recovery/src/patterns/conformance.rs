//! ProtocolConformance fixer.
//!
//! | Pre-condition                                              | Post-condition                              |
//! |------------------------------------------------------------|---------------------------------------------|
//! | error names `T` / `P`; file declares `struct T: A, B {`    | declaration becomes `struct T: A, B, P {`   |
//! | error names `T` / `P`; file declares `struct T {`          | declaration becomes `struct T: P {`         |
//! | `P` (or `Codable`, for Decodable/Encodable) already listed | unchanged (`None`)                          |
//! | file does not declare `T`                                  | unchanged (`None`)                          |

use std::sync::OnceLock;

use regex::Regex;

use crate::error::RecoveryResult;

fn requirement_regexes() -> &'static [Regex; 2] {
    static RE: OnceLock<[Regex; 2]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"type '([A-Za-z_][A-Za-z0-9_]*)' does not conform to protocol '(Codable|Decodable|Encodable)'")
                .expect("conformance regex is valid"),
            Regex::new(r"'([A-Za-z_][A-Za-z0-9_]*)' conform to '(Codable|Decodable|Encodable)'")
                .expect("requirement regex is valid"),
        ]
    })
}

/// `(type, protocol)` pairs named by the errors, de-duplicated.
pub fn required_conformances(errors: &[String]) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for error in errors {
        for re in requirement_regexes() {
            for caps in re.captures_iter(error) {
                let pair = (caps[1].to_string(), caps[2].to_string());
                if !pairs.contains(&pair) {
                    pairs.push(pair);
                }
            }
        }
    }
    pairs
}

fn already_conforms(list: &str, protocol: &str) -> bool {
    list.split(',').map(str::trim).any(|existing| {
        existing == protocol
            || (existing == "Codable" && (protocol == "Decodable" || protocol == "Encodable"))
    })
}

fn add_conformance(content: &str, type_name: &str, protocol: &str) -> RecoveryResult<Option<String>> {
    let pattern = format!(
        r"(?m)^(?P<head>[ \t]*(?:(?:public|private|internal|fileprivate|final|open)[ \t]+)*(?:struct|class|enum)[ \t]+{}(?:<[^>{{\n]*>)?)(?P<inherit>[ \t]*:[^{{\n]*?)?(?P<tail>[ \t]*\{{)",
        regex::escape(type_name)
    );
    let re = Regex::new(&pattern)?;

    let Some(caps) = re.captures(content) else {
        return Ok(None);
    };
    let whole = caps.get(0).map(|m| m.range()).unwrap_or_default();
    let head = &caps["head"];
    let tail = &caps["tail"];

    let declaration = match caps.name("inherit") {
        Some(inherit) => {
            let list = inherit.as_str().trim().trim_start_matches(':');
            if already_conforms(list, protocol) {
                return Ok(None);
            }
            format!("{}{}, {}{}", head, inherit.as_str().trim_end(), protocol, tail)
        }
        None => format!("{}: {}{}", head, protocol, tail),
    };

    let mut fixed = String::with_capacity(content.len() + protocol.len() + 2);
    fixed.push_str(&content[..whole.start]);
    fixed.push_str(&declaration);
    fixed.push_str(&content[whole.end..]);
    Ok(Some(fixed))
}

pub fn fix(content: &str, errors: &[String]) -> RecoveryResult<Option<String>> {
    let mut current = content.to_string();
    let mut changed = false;

    for (type_name, protocol) in required_conformances(errors) {
        if let Some(fixed) = add_conformance(&current, &type_name, &protocol)? {
            current = fixed;
            changed = true;
        }
    }

    Ok(changed.then_some(current))
}
