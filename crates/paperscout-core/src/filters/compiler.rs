//! Filter compilation
//!
//! Lowers a [`SearchFilters`] set into the vector index's native
//! predicate representation: a conjunction of per-field conditions
//! plus an optional must-not clause. The output serializes directly
//! to the Qdrant REST filter JSON.

use super::{SearchFilters, YearFilter};
use serde::Serialize;

/// Earliest year in the corpus (ACL started around 1965)
const MIN_CORPUS_YEAR: i32 = 1965;

/// Cap on enumerated year values in a range predicate
const MAX_YEAR_SPAN: i32 = 50;

/// Match expression for a single payload field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Matcher {
    /// Exact value match
    Value { value: String },
    /// Full-text/substring match
    Text { text: String },
    /// Match any of the given values
    Any { any: Vec<String> },
}

/// A single predicate condition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Condition {
    /// Field condition keyed on a payload field
    Field {
        key: String,
        #[serde(rename = "match")]
        matcher: Matcher,
    },
    /// Emptiness check on a payload field
    IsEmpty { is_empty: PayloadField },
}

/// Payload field reference for emptiness checks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadField {
    pub key: String,
}

/// Compiled filter predicate: all of `must`, none of `must_not`
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Predicate {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Condition>,
}

impl Predicate {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty()
    }
}

/// Compiles [`SearchFilters`] into [`Predicate`]s.
///
/// Pure and deterministic apart from the current-year default for
/// open-ended ranges.
#[derive(Debug, Clone, Default)]
pub struct FilterCompiler;

impl FilterCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile a filter set. Returns `None` when no conditions result.
    pub fn compile(&self, filters: &SearchFilters) -> Option<Predicate> {
        if filters.is_empty() {
            return None;
        }

        let mut must = Vec::new();
        let mut must_not = Vec::new();

        if let Some(ref year) = filters.year {
            must.extend(self.year_conditions(year));
        }

        if let Some(ref bibkey) = filters.bibkey {
            must.push(Condition::Field {
                key: "bibkey".to_string(),
                matcher: Matcher::Value {
                    value: bibkey.clone(),
                },
            });
        }

        if let Some(ref keywords) = filters.title_keywords {
            for keyword in keywords {
                must.push(Condition::Field {
                    key: "title".to_string(),
                    matcher: Matcher::Text {
                        text: keyword.clone(),
                    },
                });
            }
        }

        if let Some(ref language) = filters.language {
            must.push(Condition::Field {
                key: "language".to_string(),
                matcher: Matcher::Value {
                    value: language.clone(),
                },
            });
        }

        if let Some(ref authors) = filters.authors {
            for author in authors {
                must.push(Condition::Field {
                    key: "authors".to_string(),
                    matcher: Matcher::Text {
                        text: author.clone(),
                    },
                });
            }
        }

        if filters.has_awards == Some(true) {
            // Require a non-empty awards field (existence, not content)
            must_not.push(Condition::IsEmpty {
                is_empty: PayloadField {
                    key: "awards".to_string(),
                },
            });
        } else if let Some(ref awards) = filters.awards {
            if !awards.is_empty() {
                must.push(Condition::Field {
                    key: "awards".to_string(),
                    matcher: Matcher::Any {
                        any: awards.clone(),
                    },
                });
            }
        }

        let predicate = Predicate { must, must_not };
        if predicate.is_empty() {
            None
        } else {
            Some(predicate)
        }
    }

    /// Build year conditions.
    ///
    /// Year is stored as a string in the payload, so ranges cannot use
    /// numeric comparison: the span is enumerated as year strings,
    /// capped at [`MAX_YEAR_SPAN`] values anchored at the max end.
    fn year_conditions(&self, year: &YearFilter) -> Vec<Condition> {
        let mut conditions = Vec::new();

        if let Some(exact) = year.exact {
            conditions.push(Condition::Field {
                key: "year".to_string(),
                matcher: Matcher::Value {
                    value: exact.to_string(),
                },
            });
            return conditions;
        }

        if year.min_year.is_none() && year.max_year.is_none() {
            return conditions;
        }

        let current_year = chrono::Datelike::year(&chrono::Utc::now());
        let mut min = year.min_year.unwrap_or(MIN_CORPUS_YEAR);
        let max = year.max_year.unwrap_or(current_year + 1);

        if max - min + 1 > MAX_YEAR_SPAN {
            min = max - MAX_YEAR_SPAN + 1;
            tracing::warn!("year range too large, limiting to {}-{}", min, max);
        }

        if min > max {
            return conditions;
        }

        let year_strings: Vec<String> = (min..=max).map(|y| y.to_string()).collect();
        conditions.push(Condition::Field {
            key: "year".to_string(),
            matcher: Matcher::Any { any: year_strings },
        });

        conditions
    }
}
