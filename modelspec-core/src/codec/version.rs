//! Version predicates used by codecs to claim documents.
//!
//! Uses the `semver` crate when the version parses, falling back to a plain
//! string prefix check for the loose strings older tools wrote.

use serde_yaml::Value;

use crate::document::Document;

/// The document's `format_version`, stringified when written as a bare number.
pub fn format_version_of(doc: &Document) -> Option<String> {
    match doc.get("format_version")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// True when `version` is one of `accepted`, compared as strings.
pub fn is_exact(version: &str, accepted: &[&str]) -> bool {
    accepted.contains(&version)
}

/// True when `version` belongs to the `major.minor` series.
///
/// `0.3.0`, `0.3.6` and `0.3.2-beta` are all in series `0.3`; `0.30.0` is not.
pub fn in_series(version: &str, major: u64, minor: u64) -> bool {
    if let Ok(parsed) = semver::Version::parse(version) {
        return parsed.major == major && parsed.minor == minor;
    }
    version.starts_with(&format!("{}.{}.", major, minor))
}
