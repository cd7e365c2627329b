//! Domain wildcard matching for `ExternalCommunication` scopes.

/// Whether a capability scoped to `pattern` covers the `requested` domain.
///
/// - `*` covers every domain.
/// - `*.suffix` covers any name strictly below `suffix`. The requested value
///   may itself be a wildcard (`*.a.suffix` is covered by `*.suffix`).
/// - Anything else must match exactly.
///
/// Comparison is ASCII case-insensitive and ignores a trailing dot.
#[must_use]
pub fn is_domain_allowed(pattern: &str, requested: &str) -> bool {
    let pattern = pattern.trim();
    if pattern == "*" {
        return true;
    }
    let requested = normalize_domain(requested);
    if requested.is_empty() {
        return false;
    }

    match pattern.strip_prefix('*') {
        Some(suffix) if suffix.starts_with('.') => {
            // `*.` names no suffix and covers nothing.
            let suffix = normalize_domain(suffix);
            suffix.len() > 1 && requested.len() > suffix.len() && requested.ends_with(&suffix)
        },
        _ => normalize_domain(pattern) == requested,
    }
}

/// Canonical form of a domain: trimmed, ASCII lowercase, no trailing dot.
#[must_use]
pub fn normalize_domain(domain: &str) -> String {
    let trimmed = domain.trim();
    trimmed
        .strip_suffix('.')
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}
