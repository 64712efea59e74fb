//! Coordinate and location patching by `unesco_id`.

use std::fmt;

use serde::Serialize;
use unesco_map_database::{HeritageStore, SiteStore as _};
use unesco_map_database_models::SiteLocationUpdate;

use crate::ImportError;
use crate::rows::{CsvRow, CsvRows, meaningful_text, parse_coordinates};

/// Counters reported by [`update_coords`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoordsUpdateSummary {
    /// Sites with at least one applied field.
    pub updated: u64,
    /// Rows whose `unesco_id` matched no site.
    pub unknown: u64,
    /// Rows with a blank id, nothing usable to apply, or an undecodable
    /// record.
    pub skipped: u64,
}

impl fmt::Display for CoordsUpdateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "updated: {} | unknown unesco_id: {} | skipped: {}",
            self.updated, self.unknown, self.skipped
        )
    }
}

/// The partial update a row asks for.
///
/// Coordinates apply only as a valid pair; `citta` and `regione` apply when
/// neither blank nor `nan`.
#[must_use]
pub fn location_update(row: &CsvRow) -> SiteLocationUpdate {
    SiteLocationUpdate {
        coordinates: parse_coordinates(row.get("lat"), row.get("long")),
        city: meaningful_text(row.get("citta")),
        region: meaningful_text(row.get("regione")),
    }
}

/// Applies each row's location fields to the site with the same
/// `unesco_id`.
///
/// # Errors
///
/// Returns [`ImportError::Store`] if a lookup or write fails.
pub async fn update_coords(
    store: &dyn HeritageStore,
    rows: &CsvRows,
) -> Result<CoordsUpdateSummary, ImportError> {
    let mut summary = CoordsUpdateSummary::default();

    for (i, record) in rows.records().iter().enumerate() {
        let line = i + 1;
        let Ok(row) = record else {
            log::warn!("Row {line}: malformed record skipped");
            summary.skipped += 1;
            continue;
        };

        let unesco_id = row.text("unesco_id");
        if unesco_id.is_empty() {
            summary.skipped += 1;
            continue;
        }

        if store.site_by_unesco_id(unesco_id).await?.is_none() {
            log::warn!("Row {line}: unknown unesco_id {unesco_id:?}");
            summary.unknown += 1;
            continue;
        }

        let update = location_update(row);
        if update.is_empty() {
            summary.skipped += 1;
            continue;
        }

        if store.update_site_location(unesco_id, &update).await? {
            summary.updated += 1;
        }
    }

    log::info!("Coordinate update finished. {summary}");
    Ok(summary)
}
