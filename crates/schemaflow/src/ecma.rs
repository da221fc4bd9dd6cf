//! Best-effort translation of ECMA 262 regular expressions into the syntax
//! `fancy-regex` accepts.
//!
//! The dialects agree on almost everything that appears in real schemas; the
//! translation covers the escape forms that differ: `\cX` control escapes
//! and four-digit `\uXXXX` code unit escapes.
use std::borrow::Cow;

pub(crate) fn to_rust_regex(pattern: &str) -> Result<Cow<'_, str>, String> {
    if !pattern.contains('\\') {
        return Ok(Cow::Borrowed(pattern));
    }
    let mut output = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }
        match chars.next() {
            // Control escape: `\cA` is U+0001 and so on
            Some('c') => {
                let Some(letter) = chars.next().filter(char::is_ascii_alphabetic) else {
                    return Err(format!("Invalid control escape in {pattern}"));
                };
                let replacement = (letter as u8) % 32;
                output.push_str(&format!("\\x{replacement:02x}"));
            }
            // Code unit escape: a four-digit `\x{FFFF}`-style `u` form
            Some('u') => {
                if chars.peek() == Some(&'{') {
                    // Already in the `\u{...}` form both dialects accept
                    output.push_str("\\u");
                    continue;
                }
                let mut digits = String::with_capacity(4);
                for _ in 0..4 {
                    match chars.next().filter(char::is_ascii_hexdigit) {
                        Some(digit) => digits.push(digit),
                        None => return Err(format!("Invalid unicode escape in {pattern}")),
                    }
                }
                output.push_str("\\x{");
                output.push_str(&digits);
                output.push('}');
            }
            Some(other) => {
                output.push('\\');
                output.push(other);
            }
            None => return Err(format!("Trailing backslash in {pattern}")),
        }
    }
    Ok(Cow::Owned(output))
}

#[cfg(test)]
mod tests {
    use super::to_rust_regex;
    use test_case::test_case;

    #[test_case("^a*$", "^a*$"; "unchanged")]
    #[test_case("\\d+", "\\d+"; "escapes shared between dialects pass through")]
    #[test_case("\\cC", "\\x03"; "control escape")]
    #[test_case("\\u00e9", "\\x{00e9}"; "code unit escape")]
    #[test_case("\\u{1F600}", "\\u{1F600}"; "braced form untouched")]
    fn translation(pattern: &str, expected: &str) {
        assert_eq!(to_rust_regex(pattern).expect("Translatable"), expected);
    }

    #[test_case("\\u")]
    #[test_case("\\u12")]
    #[test_case("\\c1")]
    #[test_case("trailing\\")]
    fn rejected(pattern: &str) {
        assert!(to_rust_regex(pattern).is_err());
    }
}
