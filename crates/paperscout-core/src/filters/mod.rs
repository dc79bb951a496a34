//! Structured search filters
//!
//! Typed filter set extracted from queries (or supplied explicitly on
//! the request), plus the compiler that lowers it into the vector
//! index's native predicate representation.

pub mod compiler;

use crate::error::{PaperScoutError, Result};
use serde::{Deserialize, Serialize};

/// Year constraint: an exact year or an inclusive [min, max] range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct YearFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_year: Option<i32>,
}

impl YearFilter {
    /// Exact-year constraint
    pub fn exact(year: i32) -> Self {
        Self {
            exact: Some(year),
            min_year: None,
            max_year: None,
        }
    }

    /// Range constraint. Fails when `min > max`.
    pub fn range(min_year: Option<i32>, max_year: Option<i32>) -> Result<Self> {
        if let (Some(min), Some(max)) = (min_year, max_year) {
            if min > max {
                return Err(PaperScoutError::InvalidInput(format!(
                    "invalid year range: min_year {} > max_year {}",
                    min, max
                )));
            }
        }
        Ok(Self {
            exact: None,
            min_year,
            max_year,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_none() && self.min_year.is_none() && self.max_year.is_none()
    }

    /// Validate the min <= max invariant on an arbitrary value
    /// (e.g. one deserialized from a request body).
    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_year, self.max_year) {
            if min > max {
                return Err(PaperScoutError::InvalidInput(format!(
                    "invalid year range: min_year {} > max_year {}",
                    min, max
                )));
            }
        }
        Ok(())
    }
}

/// Structured filters over the paper corpus payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchFilters {
    /// Publication year (exact or range)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<YearFilter>,

    /// Exact bibkey match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibkey: Option<String>,

    /// Substrings that must all appear in the title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_keywords: Option<Vec<String>>,

    /// Language code (exact match)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Author name fragments (all must match)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,

    /// Require the paper to have at least one award
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_awards: Option<bool>,

    /// Specific award names (any-of match)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awards: Option<Vec<String>>,
}

impl SearchFilters {
    /// True when every field is unset
    pub fn is_empty(&self) -> bool {
        self.year.as_ref().map_or(true, |y| y.is_empty())
            && self.bibkey.is_none()
            && self.title_keywords.as_ref().map_or(true, |v| v.is_empty())
            && self.language.is_none()
            && self.authors.as_ref().map_or(true, |v| v.is_empty())
            && self.has_awards.is_none()
            && self.awards.as_ref().map_or(true, |v| v.is_empty())
    }

    /// Validate invariants on explicitly supplied filters
    pub fn validate(&self) -> Result<()> {
        if let Some(ref year) = self.year {
            year.validate()?;
        }
        Ok(())
    }
}

/// Merge explicit request filters with filters parsed from the query.
///
/// Field-by-field precedence: the explicit value wins whenever it is
/// set; the parsed value fills the gaps. Returns `None` when both
/// sides are absent.
pub fn merge_filters(
    explicit: Option<&SearchFilters>,
    parsed: Option<&SearchFilters>,
) -> Option<SearchFilters> {
    match (explicit, parsed) {
        (None, None) => None,
        (Some(e), None) => Some(e.clone()),
        (None, Some(p)) => Some(p.clone()),
        (Some(e), Some(p)) => Some(SearchFilters {
            year: e.year.clone().or_else(|| p.year.clone()),
            bibkey: e.bibkey.clone().or_else(|| p.bibkey.clone()),
            title_keywords: e
                .title_keywords
                .clone()
                .or_else(|| p.title_keywords.clone()),
            language: e.language.clone().or_else(|| p.language.clone()),
            authors: e.authors.clone().or_else(|| p.authors.clone()),
            has_awards: e.has_awards.or(p.has_awards),
            awards: e.awards.clone().or_else(|| p.awards.clone()),
        }),
    }
}
