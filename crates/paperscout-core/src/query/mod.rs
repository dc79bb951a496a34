//! Query classification
//!
//! Determines whether a raw query is a natural language question or an
//! ACL Anthology paper identifier. Paper ID queries are routed through
//! paper-context reformulation instead of free-text reformulation, so
//! this classification drives the entire downstream pipeline branch.
//!
//! Two ID grammars are supported:
//! - Current format: `YYYY.venue-code.number` (e.g. `2023.acl-long.412`)
//! - Legacy format: `L##-####` (e.g. `W99-0512`)

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CURRENT_ID_RE: Regex =
        Regex::new(r"(?i)\d{4}\.[a-z0-9]+-[a-z0-9]+\.\d+").unwrap();
    static ref LEGACY_ID_RE: Regex = Regex::new(r"(?i)[a-z]\d{2}-\d{4}").unwrap();
    static ref CURRENT_ID_FULL_RE: Regex =
        Regex::new(r"(?i)^\d{4}\.[a-z0-9]+-[a-z0-9]+\.\d+$").unwrap();
    static ref LEGACY_ID_FULL_RE: Regex = Regex::new(r"(?i)^[a-z]\d{2}-\d{4}$").unwrap();
}

/// Kind of user query
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    NaturalLanguage,
    PaperId,
}

/// Check whether the whole trimmed string is a valid paper ID
pub fn is_valid_paper_id(query: &str) -> bool {
    let trimmed = query.trim();
    CURRENT_ID_FULL_RE.is_match(trimmed) || LEGACY_ID_FULL_RE.is_match(trimmed)
}

/// Normalize a paper ID to its canonical form.
///
/// Legacy IDs uppercase the leading letter only; current-format IDs are
/// lowercased entirely. Normalization is idempotent.
pub fn normalize_paper_id(paper_id: &str) -> String {
    let trimmed = paper_id.trim();
    if LEGACY_ID_FULL_RE.is_match(trimmed) {
        let mut chars = trimmed.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        }
    } else {
        trimmed.to_lowercase()
    }
}

/// Extract a paper ID embedded anywhere within the query
fn extract_paper_id(query: &str) -> Option<String> {
    if let Some(m) = CURRENT_ID_RE.find(query) {
        return Some(normalize_paper_id(m.as_str()));
    }
    if let Some(m) = LEGACY_ID_RE.find(query) {
        return Some(normalize_paper_id(m.as_str()));
    }
    None
}

/// Classify a raw query string.
///
/// Tries a whole-string match against both ID grammars first, then
/// searches for an embedded ID. Pure and infallible: always returns a
/// classification.
///
/// Returns `(PaperId, Some(normalized_id))` or `(NaturalLanguage, None)`.
pub fn classify(query: &str) -> (QueryKind, Option<String>) {
    let cleaned = query.trim();

    if is_valid_paper_id(cleaned) {
        return (QueryKind::PaperId, Some(normalize_paper_id(cleaned)));
    }

    if let Some(id) = extract_paper_id(cleaned) {
        return (QueryKind::PaperId, Some(id));
    }

    (QueryKind::NaturalLanguage, None)
}
