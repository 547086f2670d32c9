//! Query shape normalization and identity hashing.
//!
//! A normalized query is the statement text with everything that varies
//! between executions of the "same" query erased: numbered placeholders,
//! string literals and numeric literals. The query hash is a SHA-256 digest of
//! that shape and is the identity key used for grouping and for persistence.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$[0-9]+").expect("Invalid placeholder regex"));

static STRING_LITERAL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(?:[^']|'')*'").expect("Invalid string literal regex"));

static NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("Invalid number regex"));

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Normalizes a raw SQL statement into its parameter-erased shape.
///
/// The rules are applied in a fixed order, each on the output of the
/// previous one:
///
/// 1. `$<digits>` placeholders become `$N`
/// 2. single-quoted literals (with `''` escapes) become `'?'`
/// 3. runs of decimal digits become `N`
/// 4. whitespace runs collapse to a single space, and the result is trimmed
///
/// # Example
///
/// ```
/// use querylens_core::normalize::normalize;
///
/// assert_eq!(
///     normalize("SELECT * FROM t WHERE id = $12 AND name = 'bob'  LIMIT 10"),
///     "SELECT * FROM t WHERE id = $N AND name = '?' LIMIT N"
/// );
/// ```
pub fn normalize(raw: &str) -> String {
    let without_placeholders = PLACEHOLDER_REGEX.replace_all(raw, "$$N");
    let without_literals = STRING_LITERAL_REGEX.replace_all(&without_placeholders, "'?'");
    let without_numbers = NUMBER_REGEX.replace_all(&without_literals, "N");
    WHITESPACE_REGEX
        .replace_all(&without_numbers, " ")
        .trim()
        .to_string()
}

/// Computes the identity hash of a normalized query.
///
/// Lowercase hex SHA-256, so the value is stable across processes, platforms
/// and releases.
pub fn query_hash(normalized: &str) -> String {
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Normalizes `raw` and returns both the shape and its hash.
pub fn fingerprint(raw: &str) -> (String, String) {
    let normalized = normalize(raw);
    let hash = query_hash(&normalized);
    (normalized, hash)
}
