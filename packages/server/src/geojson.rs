//! Builds map payloads from store rows.

use geo::{BoundingRect as _, MultiPoint, Point};
use unesco_map_database_models::{SitePage, StopRow};
use unesco_map_server_models::geojson::{
    Feature, FeatureCollection, SiteCollection, SiteProperties, StopCollection, StopProperties,
};

/// `[min_lon, min_lat, max_lon, max_lat]` over `features`, `None` when empty.
pub fn bbox<P>(features: &[Feature<P>]) -> Option<[f64; 4]> {
    let points: MultiPoint<f64> = features
        .iter()
        .map(|f| {
            let [lon, lat] = f.lon_lat();
            Point::new(lon, lat)
        })
        .collect();
    let rect = points.bounding_rect()?;
    Some([rect.min().x, rect.min().y, rect.max().x, rect.max().y])
}

/// Site features for one query page.
///
/// Sites without coordinates are left out of `features` but still counted in
/// `count`, which carries the pre-pagination total.
pub fn site_collection(page: &SitePage) -> SiteCollection {
    let features: Vec<_> = page
        .rows
        .iter()
        .filter_map(|row| {
            row.site
                .coordinates
                .map(|c| Feature::point(c, SiteProperties::from(row)))
        })
        .collect();

    let mut collection = FeatureCollection::new(features);
    collection.bbox = bbox(&collection.features);
    collection.count = Some(page.total);
    collection
}

/// Stop features of one itinerary in stop order, without `count` or `bbox`.
pub fn stop_collection(stops: &[StopRow]) -> StopCollection {
    FeatureCollection::new(
        stops
            .iter()
            .filter_map(|stop| {
                stop.site
                    .site
                    .coordinates
                    .map(|c| Feature::point(c, StopProperties::from(stop)))
            })
            .collect(),
    )
}
