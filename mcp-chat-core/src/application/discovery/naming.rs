use crate::constants::MAX_FUNCTION_NAME_LEN;

/// Replace every character outside `[A-Za-z0-9_]` with `_`.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// LLM-facing function name for `tool` on `server`. Always matches
/// `^[A-Za-z_][A-Za-z0-9_]{0,62}$`.
pub fn derive_function_name(server: &str, tool: &str) -> String {
    let mut name = format!("{}_{}", sanitize(server), sanitize(tool));
    // ASCII only after sanitizing, so byte truncation is safe.
    name.truncate(MAX_FUNCTION_NAME_LEN);

    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    if !starts_ok {
        name.insert(0, '_');
        name.truncate(MAX_FUNCTION_NAME_LEN);
    }
    name
}

/// Whether `name` is acceptable as a function declaration name.
pub fn is_valid_function_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_FUNCTION_NAME_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
