//! Lenient parsing of optional string values (query parameters, form
//! fields, environment variables).

use std::str::FromStr;

/// Parse a boolean, accepting `yes`/`no`/`y`/`n` besides the usual forms.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "y" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "n" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse `value`, falling back to `default` when it is absent, empty or
/// malformed.
pub fn opt<T: FromStr>(value: Option<&str>, default: T) -> T {
    value
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// [`opt`] with [`parse_bool`] semantics.
pub fn opt_bool(value: Option<&str>, default: bool) -> bool {
    value.and_then(parse_bool).unwrap_or(default)
}
