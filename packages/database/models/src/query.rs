//! Site filter composition.
//!
//! A [`SiteQuery`] is built from raw request parameters (or directly through
//! [`SiteQueryBuilder`]) and carries typed predicates rather than SQL. Stores
//! either evaluate it row by row with [`SiteQuery::matches`] or render it to
//! their own query language; both must honour the same stage order:
//!
//! 1. text, category, region and city predicates (always ANDed)
//! 2. accessibility conditions, folded with OR or AND per [`AccMode`]
//! 3. the "has accessibility data" exclusion
//! 4. total count, then the limit/offset window

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use unesco_map_heritage_models::{
    AccessibilityFeature, AccessibilityFlags, TriState, normalize_category_param,
    parse_flag_param,
};

use crate::{SitePage, SiteRow};

/// Page size used when `limit` is missing or malformed.
pub const DEFAULT_LIMIT: u32 = 100;

/// Largest accepted page size.
pub const MAX_LIMIT: u32 = 500;

/// Query parameter names understood by [`SiteQuery::from_params`].
pub mod params {
    use unesco_map_heritage_models::AccessibilityFeature;

    /// Free-text search over name, city and region.
    pub const SEARCH: &str = "q";
    /// Category name or alias.
    pub const CATEGORY: &str = "categoria";
    /// Region, exact match.
    pub const REGION: &str = "regione";
    /// City, exact match.
    pub const CITY: &str = "citta";
    /// Wheelchair flag.
    pub const WHEELCHAIR: &str = "wheelchair";
    /// Visual aids flag.
    pub const VISUAL_AIDS: &str = "ausili_visivi";
    /// Hearing support flag.
    pub const HEARING_SUPPORT: &str = "supporto_uditivo";
    /// `any` or `all`.
    pub const ACC_MODE: &str = "acc_mode";
    /// Only sites with at least one known accessibility flag.
    pub const HAS_ACC_DATA: &str = "has_acc_data";
    /// Page size.
    pub const LIMIT: &str = "limit";
    /// Rows to skip.
    pub const OFFSET: &str = "offset";

    /// The flag parameter for an accessibility feature.
    #[must_use]
    pub const fn for_feature(feature: AccessibilityFeature) -> &'static str {
        match feature {
            AccessibilityFeature::Wheelchair => WHEELCHAIR,
            AccessibilityFeature::VisualAids => VISUAL_AIDS,
            AccessibilityFeature::HearingSupport => HEARING_SUPPORT,
        }
    }
}

/// A string predicate on a site row. All comparisons ignore case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextPredicate {
    /// Substring of the name, the city or the region.
    Search(String),
    /// Category name equals (after alias resolution).
    Category(String),
    /// Region equals.
    Region(String),
    /// City equals.
    City(String),
}

impl TextPredicate {
    /// Evaluates the predicate against a row.
    #[must_use]
    pub fn matches(&self, row: &SiteRow) -> bool {
        match self {
            Self::Search(needle) => {
                let needle = needle.to_lowercase();
                [&row.site.name, &row.site.city, &row.site.region]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
            Self::Category(name) => row
                .category_name()
                .is_some_and(|c| c.to_lowercase() == name.to_lowercase()),
            Self::Region(region) => row.site.region.to_lowercase() == region.to_lowercase(),
            Self::City(city) => row.site.city.to_lowercase() == city.to_lowercase(),
        }
    }
}

/// How several accessibility conditions combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccMode {
    /// A site must satisfy at least one condition.
    #[default]
    Any,
    /// A site must satisfy every condition.
    All,
}

impl AccMode {
    /// Parses `acc_mode`. Only `all` (case-insensitive) selects
    /// [`AccMode::All`]; any other value falls back to [`AccMode::Any`].
    #[must_use]
    pub fn from_param(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Any
        }
    }
}

/// Equality conditions on accessibility flags, combined per [`AccMode`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibilityFilter {
    conditions: Vec<(AccessibilityFeature, bool)>,
    mode: AccMode,
}

impl AccessibilityFilter {
    /// The `(feature, required value)` conditions, in insertion order.
    #[must_use]
    pub fn conditions(&self) -> &[(AccessibilityFeature, bool)] {
        &self.conditions
    }

    /// The combination mode.
    #[must_use]
    pub const fn mode(&self) -> AccMode {
        self.mode
    }

    /// Whether no condition is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluates the conditions against a site's flags.
    ///
    /// An unknown flag, or a missing record (`None`), never satisfies a
    /// condition. With no conditions every site passes.
    #[must_use]
    pub fn matches(&self, flags: Option<&AccessibilityFlags>) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        let satisfied = |(feature, value): &(AccessibilityFeature, bool)| {
            flags.is_some_and(|f| f.get(*feature).as_option() == Some(*value))
        };
        match self.mode {
            AccMode::Any => self.conditions.iter().any(satisfied),
            AccMode::All => self.conditions.iter().all(satisfied),
        }
    }
}

/// A clamped limit/offset window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    limit: u32,
    offset: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    /// Creates a window, clamping `limit` to `[1, MAX_LIMIT]`.
    #[must_use]
    pub fn new(limit: u32, offset: u64) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset,
        }
    }

    /// Parses raw `limit`/`offset` values.
    ///
    /// Malformed values fall back to the defaults (100 and 0); well-formed
    /// integers are clamped, so `limit=0` becomes 1, `limit=9999` becomes
    /// 500 and `offset=-5` becomes 0.
    #[must_use]
    pub fn from_params(limit: Option<&str>, offset: Option<&str>) -> Self {
        let limit = limit
            .and_then(parse_int_saturating)
            .map_or(DEFAULT_LIMIT, |l| {
                u32::try_from(l.clamp(1, i64::from(MAX_LIMIT))).unwrap_or(DEFAULT_LIMIT)
            });
        let offset = offset
            .and_then(parse_int_saturating)
            .map_or(0, |o| u64::try_from(o.max(0)).unwrap_or(0));
        Self { limit, offset }
    }

    /// Page size.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }
}

/// Parses a decimal integer, saturating at the `i64` bounds instead of
/// failing on overflow. Returns `None` for anything that is not an integer.
fn parse_int_saturating(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(if negative { i64::MIN } else { i64::MAX })
}

/// A fully composed site filter with its pagination window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteQuery {
    text: Vec<TextPredicate>,
    accessibility: AccessibilityFilter,
    require_accessibility_data: bool,
    pagination: Pagination,
}

impl SiteQuery {
    /// Starts an empty query.
    #[must_use]
    pub fn builder() -> SiteQueryBuilder {
        SiteQueryBuilder::default()
    }

    /// Builds a query from request parameters.
    ///
    /// Never fails: blank values are ignored, unrecognised booleans leave
    /// their filter unset, and unknown parameter names are ignored.
    #[must_use]
    pub fn from_params(query: &BTreeMap<String, String>) -> Self {
        let get = |name: &str| query.get(name).map(String::as_str);

        let mut builder = Self::builder()
            .search(get(params::SEARCH).unwrap_or_default())
            .category(get(params::CATEGORY).unwrap_or_default())
            .region(get(params::REGION).unwrap_or_default())
            .city(get(params::CITY).unwrap_or_default());

        for &feature in AccessibilityFeature::all() {
            let state = get(params::for_feature(feature))
                .map_or(TriState::Unknown, TriState::from_query_param);
            if let Some(value) = state.as_option() {
                builder = builder.accessibility(feature, value);
            }
        }

        builder
            .mode(get(params::ACC_MODE).map_or(AccMode::Any, AccMode::from_param))
            .require_accessibility_data(get(params::HAS_ACC_DATA).is_some_and(parse_flag_param))
            .pagination(Pagination::from_params(
                get(params::LIMIT),
                get(params::OFFSET),
            ))
            .build()
    }

    /// Text, category, region and city predicates.
    #[must_use]
    pub fn text_predicates(&self) -> &[TextPredicate] {
        &self.text
    }

    /// Accessibility conditions.
    #[must_use]
    pub const fn accessibility(&self) -> &AccessibilityFilter {
        &self.accessibility
    }

    /// Whether sites without any known accessibility flag are excluded.
    #[must_use]
    pub const fn requires_accessibility_data(&self) -> bool {
        self.require_accessibility_data
    }

    /// The limit/offset window.
    #[must_use]
    pub const fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Whether a row passes every filter stage (pagination aside).
    #[must_use]
    pub fn matches(&self, row: &SiteRow) -> bool {
        if !self.text.iter().all(|p| p.matches(row)) {
            return false;
        }
        let flags = row.accessibility.as_ref().map(|a| &a.flags);
        if !self.accessibility.matches(flags) {
            return false;
        }
        !self.require_accessibility_data || flags.is_some_and(AccessibilityFlags::has_data)
    }

    /// Filters, counts and windows an in-memory row set.
    ///
    /// Rows are expected in their canonical order (ascending site id).
    #[must_use]
    pub fn apply(&self, rows: impl IntoIterator<Item = SiteRow>) -> SitePage {
        let matching: Vec<SiteRow> = rows.into_iter().filter(|r| self.matches(r)).collect();
        let total = matching.len() as u64;
        let skip = usize::try_from(self.pagination.offset).unwrap_or(usize::MAX);
        let take = usize::try_from(self.pagination.limit).unwrap_or(usize::MAX);
        SitePage {
            rows: matching.into_iter().skip(skip).take(take).collect(),
            total,
        }
    }
}

/// Accumulates typed predicates into a [`SiteQuery`].
#[derive(Debug, Clone, Default)]
pub struct SiteQueryBuilder {
    query: SiteQuery,
}

impl SiteQueryBuilder {
    /// Adds a free-text search. Blank input is ignored.
    #[must_use]
    pub fn search(mut self, needle: &str) -> Self {
        let needle = needle.trim();
        if !needle.is_empty() {
            self.query.text.push(TextPredicate::Search(needle.to_string()));
        }
        self
    }

    /// Adds a category filter, resolving `cultural`/`natural` aliases.
    /// Blank input is ignored.
    #[must_use]
    pub fn category(mut self, name: &str) -> Self {
        if !name.trim().is_empty() {
            self.query
                .text
                .push(TextPredicate::Category(normalize_category_param(name)));
        }
        self
    }

    /// Adds a region filter. Blank input is ignored.
    #[must_use]
    pub fn region(mut self, region: &str) -> Self {
        let region = region.trim();
        if !region.is_empty() {
            self.query.text.push(TextPredicate::Region(region.to_string()));
        }
        self
    }

    /// Adds a city filter. Blank input is ignored.
    #[must_use]
    pub fn city(mut self, city: &str) -> Self {
        let city = city.trim();
        if !city.is_empty() {
            self.query.text.push(TextPredicate::City(city.to_string()));
        }
        self
    }

    /// Requires a feature flag to equal `value`.
    #[must_use]
    pub fn accessibility(mut self, feature: AccessibilityFeature, value: bool) -> Self {
        self.query.accessibility.conditions.push((feature, value));
        self
    }

    /// Sets how accessibility conditions combine.
    #[must_use]
    pub const fn mode(mut self, mode: AccMode) -> Self {
        self.query.accessibility.mode = mode;
        self
    }

    /// Excludes sites without any known accessibility flag.
    #[must_use]
    pub const fn require_accessibility_data(mut self, required: bool) -> Self {
        self.query.require_accessibility_data = required;
        self
    }

    /// Sets the limit/offset window.
    #[must_use]
    pub const fn pagination(mut self, pagination: Pagination) -> Self {
        self.query.pagination = pagination;
        self
    }

    /// Finishes the query.
    #[must_use]
    pub fn build(self) -> SiteQuery {
        self.query
    }
}
