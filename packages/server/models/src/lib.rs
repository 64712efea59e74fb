#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the heritage map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the database row types to allow independent evolution of the API
//! contract.

pub mod geojson;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use unesco_map_database_models::{ItinerarySummary, StopRow};
use unesco_map_heritage_models::{
    Booking, Category, FieldError, FollowStatus, Itinerary, ModelError, NewBooking,
};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Error body returned with every non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
    /// Per-field validation failures, when the request body was rejected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl ApiError {
    /// An error with no field details.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fields: vec![],
        }
    }

    /// A validation error listing the failing fields.
    #[must_use]
    pub fn invalid(fields: Vec<FieldError>) -> Self {
        Self {
            error: "Invalid request".to_string(),
            fields,
        }
    }
}

/// A category as returned by `/api/categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCategory {
    /// Internal id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
}

impl From<Category> for ApiCategory {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
        }
    }
}

/// One entry of the itinerary listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiItinerarySummary {
    /// Internal id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Some stop has wheelchair access.
    pub has_wheelchair: bool,
    /// Some stop has visual aids.
    pub has_visivi: bool,
    /// Some stop has hearing support.
    pub has_uditivo: bool,
    /// Whether the current user follows this itinerary.
    pub followed: bool,
}

impl ApiItinerarySummary {
    /// Builds an entry from a store summary.
    #[must_use]
    pub fn new(summary: ItinerarySummary, followed: bool) -> Self {
        Self {
            id: summary.itinerary.id,
            name: summary.itinerary.name,
            description: summary.itinerary.description,
            has_wheelchair: summary.accessibility.wheelchair,
            has_visivi: summary.accessibility.visual_aids,
            has_uditivo: summary.accessibility.hearing_support,
            followed,
        }
    }
}

/// Query parameters for `/api/itinerari`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItineraryListParams {
    /// 1-based page number, kept raw so malformed values fall back to 1.
    pub page: Option<String>,
}

/// One page of the itinerary listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiItineraryList {
    /// Itineraries on this page, ordered by name.
    pub items: Vec<ApiItinerarySummary>,
    /// Total number of itineraries.
    pub total: u64,
    /// Current page.
    pub page: u32,
    /// Number of pages.
    pub num_pages: u64,
}

/// One stop of an itinerary detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiStop {
    /// Stop position.
    pub order: u32,
    /// Internal site id.
    pub site_id: i64,
    /// UNESCO identifier.
    pub unesco_id: String,
    /// Site name.
    pub name: String,
    /// City.
    pub city: String,
    /// Region.
    pub region: String,
    /// Category name.
    pub category: Option<String>,
    /// Latitude, if known.
    pub latitude: Option<f64>,
    /// Longitude, if known.
    pub longitude: Option<f64>,
}

impl From<StopRow> for ApiStop {
    fn from(stop: StopRow) -> Self {
        let category = stop.site.category_name().map(str::to_string);
        let site = stop.site.site;
        Self {
            order: stop.order,
            site_id: site.id,
            unesco_id: site.unesco_id,
            name: site.name,
            city: site.city,
            region: site.region,
            category,
            latitude: site.coordinates.map(|c| c.latitude()),
            longitude: site.coordinates.map(|c| c.longitude()),
        }
    }
}

/// An itinerary with its stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiItineraryDetail {
    /// Internal id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Stops in order.
    pub stops: Vec<ApiStop>,
    /// Whether the current user follows this itinerary.
    pub is_followed: bool,
}

impl ApiItineraryDetail {
    /// Builds the detail payload.
    #[must_use]
    pub fn new(itinerary: Itinerary, stops: Vec<StopRow>, is_followed: bool) -> Self {
        Self {
            id: itinerary.id,
            name: itinerary.name,
            description: itinerary.description,
            stops: stops.into_iter().map(ApiStop::from).collect(),
            is_followed,
        }
    }
}

/// Response of the follow toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiFollowStatus {
    /// `"added"` or `"removed"`.
    pub status: FollowStatus,
}

/// Booking form body, with the field names the frontend submits.
///
/// Every field is optional at the wire level so missing values surface as
/// field errors rather than a body decoding failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingForm {
    /// Requester name.
    #[serde(default)]
    pub nome: Option<String>,
    /// Requester email.
    #[serde(default)]
    pub email: Option<String>,
    /// Visit date, `YYYY-MM-DD`.
    #[serde(default)]
    pub data: Option<String>,
    /// Party size.
    #[serde(default)]
    pub numero_persone: Option<i64>,
    /// Free-text notes.
    #[serde(default)]
    pub note: Option<String>,
}

impl BookingForm {
    /// Parses and validates the form for `itinerary_id` as of `today`.
    ///
    /// # Errors
    ///
    /// Returns every failing field: missing or unparsable values as well as
    /// the rules of [`NewBooking::validate`].
    pub fn into_new_booking(
        self,
        itinerary_id: i64,
        today: NaiveDate,
    ) -> Result<NewBooking, Vec<FieldError>> {
        let mut errors = Vec::new();

        let date = match self.data.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("data", "This field is required."));
                None
            }
            Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d").ok().or_else(|| {
                errors.push(FieldError::new("data", "Enter a valid date."));
                None
            }),
        };

        let party_size = match self.numero_persone {
            None => {
                errors.push(FieldError::new("numero_persone", "This field is required."));
                None
            }
            Some(n) if n > i64::from(u32::MAX) => {
                errors.push(FieldError::new(
                    "numero_persone",
                    format!("Ensure this value is less than or equal to {}.", u32::MAX),
                ));
                None
            }
            Some(n) => Some(u32::try_from(n).unwrap_or(0)),
        };

        // Placeholders for fields that already failed to parse always pass
        // validation, so each field is reported once.
        let booking = NewBooking {
            itinerary_id,
            name: self.nome.unwrap_or_default().trim().to_string(),
            email: self.email.unwrap_or_default().trim().to_string(),
            date: date.unwrap_or(NaiveDate::MAX),
            party_size: party_size.unwrap_or(1),
            note: self.note.unwrap_or_default().trim().to_string(),
        };

        if let Err(ModelError::InvalidBooking(invalid)) = booking.validate(today) {
            errors.extend(invalid);
        }

        if errors.is_empty() {
            Ok(booking)
        } else {
            errors.sort_by(|a, b| a.field.cmp(&b.field));
            Err(errors)
        }
    }
}

/// A stored booking as returned after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiBooking {
    /// Internal id.
    pub id: i64,
    /// Booked itinerary.
    pub itinerary_id: i64,
    /// Requester name.
    pub nome: String,
    /// Requester email.
    pub email: String,
    /// Visit date.
    pub data: NaiveDate,
    /// Party size.
    pub numero_persone: u32,
    /// Free-text notes.
    pub note: String,
    /// Creation time, RFC 3339.
    pub created_at: String,
}

impl From<Booking> for ApiBooking {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            itinerary_id: booking.itinerary_id,
            nome: booking.name,
            email: booking.email,
            data: booking.date,
            numero_persone: booking.party_size,
            note: booking.note,
            created_at: booking.created_at.to_rfc3339(),
        }
    }
}
