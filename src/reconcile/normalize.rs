//! Name canonicalization for comparison.

/// Normalize a full name for matching: fold ё/Ё to е/Е, collapse internal
/// whitespace runs to a single space, trim, lowercase.
///
/// Idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(name: &str) -> String {
    name.replace('ё', "е")
        .replace('Ё', "Е")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
