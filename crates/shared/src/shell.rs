//! Shell quoting for command strings executed inside containers.
//!
//! Commands reach the container as a single `sh -c` argument, so every
//! caller-supplied value must be quoted before it is interpolated.

/// Quotes a value for a POSIX shell.
///
/// Values made only of characters that carry no shell meaning are returned
/// unchanged; anything else is wrapped in single quotes with embedded single
/// quotes written as `'\''`.
pub fn quote(value: &str) -> String {
    if !value.is_empty() && value.chars().all(is_plain) {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

fn is_plain(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '=' | ',' | '+')
}
