//! GeoJSON wire types for site and itinerary maps.
//!
//! Only the subset the map frontend consumes is modelled: point features in
//! a feature collection, with typed property payloads.

use serde::{Deserialize, Serialize};
use unesco_map_database_models::{SiteRow, StopRow};
use unesco_map_heritage_models::{Accessibility, Coordinates, TriState};

/// `"FeatureCollection"` discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureCollectionType {
    /// The only value.
    #[default]
    FeatureCollection,
}

/// `"Feature"` discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureType {
    /// The only value.
    #[default]
    Feature,
}

/// `"Point"` discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointType {
    /// The only value.
    #[default]
    Point,
}

/// A point geometry, `[longitude, latitude]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    /// Always `"Point"`.
    #[serde(rename = "type")]
    pub kind: PointType,
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

impl From<Coordinates> for PointGeometry {
    fn from(c: Coordinates) -> Self {
        Self {
            kind: PointType::Point,
            coordinates: [c.longitude(), c.latitude()],
        }
    }
}

/// A point feature carrying `P` as its properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature<P> {
    /// Always `"Feature"`.
    #[serde(rename = "type")]
    pub kind: FeatureType,
    /// Feature position.
    pub geometry: PointGeometry,
    /// Feature payload.
    pub properties: P,
}

impl<P> Feature<P> {
    /// Creates a point feature.
    pub fn point(coordinates: Coordinates, properties: P) -> Self {
        Self {
            kind: FeatureType::Feature,
            geometry: coordinates.into(),
            properties,
        }
    }

    /// `[longitude, latitude]` of the feature.
    pub const fn lon_lat(&self) -> [f64; 2] {
        self.geometry.coordinates
    }
}

/// A feature collection.
///
/// `count` and `bbox` are omitted from the output when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection<P> {
    /// Always `"FeatureCollection"`.
    #[serde(rename = "type")]
    pub kind: FeatureCollectionType,
    /// Features in output order.
    pub features: Vec<Feature<P>>,
    /// Number of matching records, including ones without a position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// `[min_lon, min_lat, max_lon, max_lat]` over `features`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
}

impl<P> FeatureCollection<P> {
    /// A collection with no `count` and no `bbox`.
    #[must_use]
    pub const fn new(features: Vec<Feature<P>>) -> Self {
        Self {
            kind: FeatureCollectionType::FeatureCollection,
            features,
            count: None,
            bbox: None,
        }
    }
}

/// The `acc` object of a site feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccProperties {
    /// Wheelchair access.
    pub sedia_a_rotelle: TriState,
    /// Visual aids.
    pub ausili_visivi: TriState,
    /// Hearing support.
    pub supporto_uditivo: TriState,
    /// Some flag is known.
    pub has_data: bool,
    /// Some flag is true.
    pub any_true: bool,
}

impl From<Option<&Accessibility>> for AccProperties {
    fn from(accessibility: Option<&Accessibility>) -> Self {
        accessibility.map_or_else(Self::default, |a| Self {
            sedia_a_rotelle: a.flags.wheelchair,
            ausili_visivi: a.flags.visual_aids,
            supporto_uditivo: a.flags.hearing_support,
            has_data: a.flags.has_data(),
            any_true: a.flags.any_true(),
        })
    }
}

/// Properties of a site feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProperties {
    /// Internal id.
    pub id: i64,
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
    /// Accessibility summary.
    pub acc: AccProperties,
}

impl From<&SiteRow> for SiteProperties {
    fn from(row: &SiteRow) -> Self {
        Self {
            id: row.site.id,
            unesco_id: row.site.unesco_id.clone(),
            name: row.site.name.clone(),
            city: row.site.city.clone(),
            region: row.site.region.clone(),
            category: row.category_name().map(str::to_string),
            acc: row.accessibility.as_ref().into(),
        }
    }
}

/// Properties of an itinerary stop feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopProperties {
    /// Internal site id.
    pub id: i64,
    /// Site name.
    pub name: String,
    /// City.
    pub city: String,
    /// Region.
    pub region: String,
    /// Stop position.
    pub order: u32,
    /// Category name.
    pub category: Option<String>,
}

impl From<&StopRow> for StopProperties {
    fn from(stop: &StopRow) -> Self {
        Self {
            id: stop.site.site.id,
            name: stop.site.site.name.clone(),
            city: stop.site.site.city.clone(),
            region: stop.site.site.region.clone(),
            order: stop.order,
            category: stop.site.category_name().map(str::to_string),
        }
    }
}

/// Sites map payload.
pub type SiteCollection = FeatureCollection<SiteProperties>;

/// Itinerary map payload.
pub type StopCollection = FeatureCollection<StopProperties>;
