#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types and site query definitions.
//!
//! These types represent the shapes of data as stored in and retrieved from
//! the heritage store. They are distinct from the API response types in
//! `unesco_map_server_models` and from the bare domain records in
//! `unesco_map_heritage_models`: a [`SiteRow`] is a site joined with its
//! category and accessibility record, as every read path needs them.

pub mod query;

use serde::{Deserialize, Serialize};
use unesco_map_heritage_models::{
    Accessibility, AccessibilityFlags, Category, Coordinates, Itinerary, Site,
};

pub use query::{AccMode, AccessibilityFilter, Pagination, SiteQuery, SiteQueryBuilder, TextPredicate};

/// Number of itineraries per listing page.
pub const ITINERARIES_PER_PAGE: u32 = 12;

/// A site joined with its category and accessibility record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRow {
    /// The site itself.
    pub site: Site,
    /// Referenced category, if any.
    pub category: Option<Category>,
    /// Referenced accessibility record, if any.
    pub accessibility: Option<Accessibility>,
}

impl SiteRow {
    /// Name of the referenced category.
    #[must_use]
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.name.as_str())
    }

    /// Accessibility flags, all unknown when no record is attached.
    #[must_use]
    pub fn accessibility_flags(&self) -> AccessibilityFlags {
        self.accessibility
            .as_ref()
            .map(|a| a.flags)
            .unwrap_or_default()
    }
}

/// One page of a filtered site query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SitePage {
    /// Rows in the requested window.
    pub rows: Vec<SiteRow>,
    /// Number of matching sites, ignoring pagination.
    pub total: u64,
}

/// Values written when creating or updating a site by UNESCO id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteUpsert {
    /// External UNESCO identifier; the match key.
    pub unesco_id: String,
    /// Site name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Italian region.
    pub region: String,
    /// City or locality.
    pub city: String,
    /// Position.
    pub coordinates: Option<Coordinates>,
    /// Year of inscription.
    pub inscription_year: Option<i32>,
    /// Category reference.
    pub category_id: Option<i64>,
    /// Accessibility reference.
    pub accessibility_id: Option<i64>,
}

/// Result of [`SiteUpsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertOutcome {
    /// Primary key of the written row.
    pub id: i64,
    /// Whether the row was newly inserted.
    pub created: bool,
}

/// Partial update of a site's location fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteLocationUpdate {
    /// New position.
    pub coordinates: Option<Coordinates>,
    /// New city.
    pub city: Option<String>,
    /// New region.
    pub region: Option<String>,
}

impl SiteLocationUpdate {
    /// Whether the update would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.coordinates.is_none() && self.city.is_none() && self.region.is_none()
    }
}

/// A stop joined with its site, as returned for itinerary detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRow {
    /// Position in the itinerary.
    pub order: u32,
    /// The visited site.
    pub site: SiteRow,
}

/// Whether any stop of an itinerary offers each accessibility feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryAccessibility {
    /// Some stop has wheelchair access.
    pub wheelchair: bool,
    /// Some stop has visual aids.
    pub visual_aids: bool,
    /// Some stop has hearing support.
    pub hearing_support: bool,
}

impl ItineraryAccessibility {
    /// Folds the flags of every stop's site.
    pub fn from_flags<'a>(flags: impl IntoIterator<Item = &'a AccessibilityFlags>) -> Self {
        flags.into_iter().fold(Self::default(), |acc, f| Self {
            wheelchair: acc.wheelchair || f.wheelchair.is_yes(),
            visual_aids: acc.visual_aids || f.visual_aids.is_yes(),
            hearing_support: acc.hearing_support || f.hearing_support.is_yes(),
        })
    }
}

/// An itinerary with its derived accessibility flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItinerarySummary {
    /// The itinerary.
    pub itinerary: Itinerary,
    /// Existence flags over its stops.
    pub accessibility: ItineraryAccessibility,
}

/// One page of the itinerary listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryPage {
    /// Itineraries on this page, ordered by name.
    pub items: Vec<ItinerarySummary>,
    /// Total number of itineraries.
    pub total: u64,
}

/// A 1-based page request for the itinerary listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub per_page: u32,
}

impl PageRequest {
    /// Parses the `page` parameter. Missing, non-numeric or zero values
    /// select the first page.
    #[must_use]
    pub fn from_param(page: Option<&str>) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        Self {
            page,
            per_page: ITINERARIES_PER_PAGE,
        }
    }

    /// Number of rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Number of pages needed for `total` rows (at least one).
    #[must_use]
    pub fn num_pages(&self, total: u64) -> u64 {
        if total == 0 || self.per_page == 0 {
            1
        } else {
            total.div_ceil(u64::from(self.per_page))
        }
    }
}
