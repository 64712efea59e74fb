#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Heritage site, accessibility, and itinerary domain types.
//!
//! This crate defines the canonical shapes shared across the unesco-map
//! system: UNESCO sites with optional coordinates, the two canonical site
//! categories, tri-state accessibility flags, and the itinerary/booking
//! records built on top of them. It also owns the string coercion rules
//! used by both the HTTP query layer and the CSV import tooling.

pub mod itinerary;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

pub use itinerary::{
    Booking, FieldError, FollowRecord, FollowStatus, Itinerary, NewBooking, Stop,
};

/// Errors raised when constructing domain values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Latitude or longitude outside the WGS84 range.
    #[error("coordinates out of range: latitude {latitude}, longitude {longitude}")]
    CoordinatesOutOfRange {
        /// The rejected latitude.
        latitude: f64,
        /// The rejected longitude.
        longitude: f64,
    },

    /// One or more booking fields failed validation.
    #[error("invalid booking: {}", itinerary::describe_field_errors(.0))]
    InvalidBooking(Vec<FieldError>),
}

/// A boolean that may also be unknown.
///
/// Serialized as `true`, `false` or `null`. `Unknown` is never equal to
/// `No`: a filter asking for `false` must not match an unknown value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum TriState {
    /// The value has not been recorded.
    #[default]
    Unknown,
    /// Known to be true.
    Yes,
    /// Known to be false.
    No,
}

impl TriState {
    /// Coerces an HTTP query parameter value.
    ///
    /// `1`, `true`, `yes`, `y` map to [`TriState::Yes`]; `0`, `false`, `no`,
    /// `n` map to [`TriState::No`] (case-insensitive, surrounding whitespace
    /// ignored). Anything else, including the empty string, is
    /// [`TriState::Unknown`], which callers treat as "filter not applied".
    #[must_use]
    pub fn from_query_param(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "y" => Self::Yes,
            "0" | "false" | "no" | "n" => Self::No,
            _ => Self::Unknown,
        }
    }

    /// Coerces a CSV cell value.
    ///
    /// Accepts a wider vocabulary than [`TriState::from_query_param`]:
    /// `t`/`f`, Italian `si`/`s` and `on`/`off` are also recognised. Blank
    /// or unrecognised cells are [`TriState::Unknown`].
    #[must_use]
    pub fn from_csv_value(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "1" | "true" | "t" | "yes" | "y" | "si" | "s" | "on" => Self::Yes,
            "0" | "false" | "f" | "no" | "n" | "off" => Self::No,
            _ => Self::Unknown,
        }
    }

    /// Returns the value as an optional boolean.
    #[must_use]
    pub const fn as_option(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Yes => Some(true),
            Self::No => Some(false),
        }
    }

    /// Whether a value has been recorded.
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Whether the value is known to be true.
    #[must_use]
    pub const fn is_yes(self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Self::Unknown,
            Some(true) => Self::Yes,
            Some(false) => Self::No,
        }
    }
}

impl From<TriState> for Option<bool> {
    fn from(value: TriState) -> Self {
        value.as_option()
    }
}

/// Parses a boolean flag parameter such as `has_acc_data`.
///
/// Only the affirmative vocabulary of [`TriState::from_query_param`] turns
/// the flag on; everything else leaves it off.
#[must_use]
pub fn parse_flag_param(value: &str) -> bool {
    TriState::from_query_param(value).is_yes()
}

/// One of the three accessibility attributes tracked per site.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AccessibilityFeature {
    /// Step-free access for wheelchair users.
    Wheelchair,
    /// Aids for blind or partially sighted visitors.
    VisualAids,
    /// Support for deaf or hard-of-hearing visitors.
    HearingSupport,
}

impl AccessibilityFeature {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Wheelchair, Self::VisualAids, Self::HearingSupport]
    }
}

/// The three tri-state accessibility flags of a site.
///
/// Accessibility records are deduplicated on this triple during import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AccessibilityFlags {
    /// Wheelchair access.
    pub wheelchair: TriState,
    /// Visual aids.
    pub visual_aids: TriState,
    /// Hearing support.
    pub hearing_support: TriState,
}

impl AccessibilityFlags {
    /// Creates a flag triple.
    #[must_use]
    pub const fn new(wheelchair: TriState, visual_aids: TriState, hearing_support: TriState) -> Self {
        Self {
            wheelchair,
            visual_aids,
            hearing_support,
        }
    }

    /// Returns the flag for a single feature.
    #[must_use]
    pub const fn get(&self, feature: AccessibilityFeature) -> TriState {
        match feature {
            AccessibilityFeature::Wheelchair => self.wheelchair,
            AccessibilityFeature::VisualAids => self.visual_aids,
            AccessibilityFeature::HearingSupport => self.hearing_support,
        }
    }

    /// At least one flag is known (true or false).
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.wheelchair.is_known() || self.visual_aids.is_known() || self.hearing_support.is_known()
    }

    /// At least one flag is known to be true.
    #[must_use]
    pub const fn any_true(&self) -> bool {
        self.wheelchair.is_yes() || self.visual_aids.is_yes() || self.hearing_support.is_yes()
    }

    /// All three flags are known to be true.
    #[must_use]
    pub const fn all_true(&self) -> bool {
        self.wheelchair.is_yes() && self.visual_aids.is_yes() && self.hearing_support.is_yes()
    }
}

/// An accessibility record, possibly shared by several sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessibility {
    /// Database primary key.
    pub id: i64,
    /// The tri-state flags.
    pub flags: AccessibilityFlags,
    /// Free-text notes.
    pub note: Option<String>,
}

impl Accessibility {
    /// See [`AccessibilityFlags::has_data`].
    #[must_use]
    pub const fn has_data(&self) -> bool {
        self.flags.has_data()
    }

    /// See [`AccessibilityFlags::any_true`].
    #[must_use]
    pub const fn any_true(&self) -> bool {
        self.flags.any_true()
    }

    /// See [`AccessibilityFlags::all_true`].
    #[must_use]
    pub const fn all_true(&self) -> bool {
        self.flags.all_true()
    }
}

/// The two canonical UNESCO site categories.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
)]
pub enum CanonicalCategory {
    /// Cultural heritage.
    Culturale,
    /// Natural heritage.
    Naturale,
}

impl CanonicalCategory {
    /// Resolves the aliases accepted by the `categoria` query parameter.
    ///
    /// Only the English and Italian singular spellings are aliased; other
    /// values are matched verbatim against stored category names.
    #[must_use]
    pub fn from_query_alias(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "cultural" | "culturale" => Some(Self::Culturale),
            "natural" | "naturale" => Some(Self::Naturale),
            _ => None,
        }
    }

    /// Maps any known spelling of a category name onto its canonical form.
    ///
    /// Used when merging duplicate categories; returns `None` for names that
    /// are not recognised at all.
    #[must_use]
    pub fn normalize(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "culturale" | "cultural" | "cultura" | "culturali" => Some(Self::Culturale),
            "naturale" | "natural" | "natura" | "naturali" => Some(Self::Naturale),
            _ => None,
        }
    }
}

/// Normalizes a `categoria` filter value into the name to compare against.
#[must_use]
pub fn normalize_category_param(value: &str) -> String {
    let trimmed = value.trim();
    CanonicalCategory::from_query_alias(trimmed)
        .map_or_else(|| trimmed.to_string(), |c| c.to_string())
}

/// A row in the `categories` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Database primary key.
    pub id: i64,
    /// Unique category name.
    pub name: String,
    /// Free-text description.
    pub description: String,
}

/// A WGS84 position whose latitude and longitude are both in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Creates a position.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::CoordinatesOutOfRange`] if the latitude is
    /// outside `[-90, 90]`, the longitude is outside `[-180, 180]`, or either
    /// value is not finite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ModelError> {
        if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(ModelError::CoordinatesOutOfRange {
                latitude,
                longitude,
            })
        }
    }

    /// Builds a position from two nullable columns.
    ///
    /// Returns `None` unless both values are present and in range.
    #[must_use]
    pub fn from_pair(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        Self::new(latitude?, longitude?).ok()
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// A UNESCO heritage site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// Database primary key.
    pub id: i64,
    /// External UNESCO identifier (unique).
    pub unesco_id: String,
    /// Site name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Italian region.
    pub region: String,
    /// City or locality.
    pub city: String,
    /// Position, absent when the source had no usable coordinates.
    pub coordinates: Option<Coordinates>,
    /// Year of inscription on the World Heritage List.
    pub inscription_year: Option<i32>,
    /// Referenced category.
    pub category_id: Option<i64>,
    /// Referenced accessibility record.
    pub accessibility_id: Option<i64>,
}
