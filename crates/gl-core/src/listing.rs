//! Listing queries over image records.
//!
//! A [`ListQuery`] filters records by a case-insensitive name substring,
//! orders them by upload time or by name, and keeps the first `limit`. The
//! same filter is used by the client for instant, pre-server feedback.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::QueryConfig;
use crate::image::ImageRecord;
use crate::Error;

/// Field a listing is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum SortKey {
    #[default]
    #[serde(rename = "uploadedAt")]
    UploadedAt,
    #[serde(rename = "name")]
    Name,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::UploadedAt => "uploadedAt",
            SortKey::Name => "name",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("uploadedAt") {
            Ok(SortKey::UploadedAt)
        } else if s.eq_ignore_ascii_case("name") {
            Ok(SortKey::Name)
        } else {
            Err(Error::invalid_field(
                "sort",
                format!("Invalid sort '{s}'. Valid values: uploadedAt, name"),
            ))
        }
    }
}

/// Direction of a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(SortOrder::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(SortOrder::Desc)
        } else {
            Err(Error::invalid_field(
                "order",
                format!("Invalid order '{s}'. Valid values: asc, desc"),
            ))
        }
    }
}

/// Response shape of a listing.
///
/// `total` is the number of records returned, i.e. counted after the limit
/// was applied, not the number of matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ImageList {
    pub images: Vec<ImageRecord>,
    pub total: usize,
    pub search: Option<String>,
}

impl ImageList {
    pub fn empty() -> Self {
        Self {
            images: Vec::new(),
            total: 0,
            search: None,
        }
    }
}

/// A fully-resolved listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: usize,
}

impl ListQuery {
    /// Resolve a request against configured limits.
    ///
    /// An empty search means no search. A missing limit takes the configured
    /// default; any limit is clamped into `1..=max_limit`.
    pub fn new(
        search: Option<String>,
        sort: SortKey,
        order: SortOrder,
        limit: Option<i64>,
        limits: &QueryConfig,
    ) -> Self {
        let max = limits.max_limit.max(1) as i64;
        let limit = limit
            .unwrap_or(limits.default_limit as i64)
            .clamp(1, max) as usize;
        Self {
            search: search.filter(|s| !s.is_empty()),
            sort,
            order,
            limit,
        }
    }

    /// Newest-first listing of everything, up to `limit`.
    pub fn latest(limit: usize) -> Self {
        Self {
            search: None,
            sort: SortKey::UploadedAt,
            order: SortOrder::Desc,
            limit: limit.max(1),
        }
    }

    /// Filter, order and truncate `records`.
    pub fn apply(&self, records: Vec<ImageRecord>) -> ImageList {
        let mut images: Vec<ImageRecord> = match self.search.as_deref() {
            Some(term) => filter_by_name(records, term),
            None => records,
        };

        match self.sort {
            SortKey::UploadedAt => images.sort_by_key(|r| r.sort_timestamp()),
            SortKey::Name => images.sort_by_cached_key(|r| collation_key(&r.name)),
        }
        // Descending is the exact reverse of ascending, ties included.
        if self.order == SortOrder::Desc {
            images.reverse();
        }

        images.truncate(self.limit);
        ImageList {
            total: images.len(),
            images,
            search: self.search.clone(),
        }
    }
}

/// Whether `name` contains `term`, ignoring case.
pub fn name_matches(name: &str, term: &str) -> bool {
    name.to_lowercase().contains(&term.to_lowercase())
}

/// Keep records whose name contains `term`, ignoring case. Order is kept.
pub fn filter_by_name(records: Vec<ImageRecord>, term: &str) -> Vec<ImageRecord> {
    let needle = term.to_lowercase();
    records
        .into_iter()
        .filter(|r| r.name.to_lowercase().contains(&needle))
        .collect()
}

/// Sort key approximating a locale-aware comparison.
///
/// Levels, most significant first: base letters ignoring accents and case,
/// then accents, then case with lowercase first, then the raw string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CollationKey {
    base: String,
    accents: String,
    case: Vec<bool>,
    raw: String,
}

pub fn collation_key(s: &str) -> CollationKey {
    let decomposed: Vec<char> = s.nfd().collect();
    let base = decomposed
        .iter()
        .filter(|c| !is_combining_mark(**c))
        .flat_map(|c| c.to_lowercase())
        .collect();
    let accents = decomposed.iter().flat_map(|c| c.to_lowercase()).collect();
    let case = decomposed
        .iter()
        .filter(|c| !is_combining_mark(**c))
        .map(|c| c.is_uppercase())
        .collect();
    CollationKey {
        base,
        accents,
        case,
        raw: s.to_string(),
    }
}
