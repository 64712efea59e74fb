//! Site CSV import.

use std::fmt;

use serde::Serialize;
use unesco_map_database::{AccessibilityStore as _, CategoryStore as _, HeritageStore, SiteStore as _};
use unesco_map_database_models::SiteUpsert;

use crate::ImportError;
use crate::rows::{CsvRow, CsvRows, SITE_COLUMNS, parse_coordinates, parse_year};

/// Rows between progress log lines.
pub const PROGRESS_EVERY: usize = 100;

/// Counters reported by [`import_sites`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SiteImportSummary {
    /// Sites inserted.
    pub created: u64,
    /// Existing sites overwritten.
    pub updated: u64,
    /// Rows without usable coordinates.
    pub skipped_invalid_coords: u64,
    /// Rows without a `unesco_id`.
    pub skipped_missing_id: u64,
    /// Records the CSV reader could not decode.
    pub skipped_malformed: u64,
}

impl fmt::Display for SiteImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created: {} | updated: {} | skipped (invalid coordinates): {} | \
             skipped (missing unesco_id): {} | skipped (malformed): {}",
            self.created,
            self.updated,
            self.skipped_invalid_coords,
            self.skipped_missing_id,
            self.skipped_malformed,
        )
    }
}

/// Creates or updates one site per CSV row, matching on `unesco_id`.
///
/// Coordinates are validated before anything is written, so a skipped row
/// leaves no category or accessibility record behind.
///
/// # Errors
///
/// Returns [`ImportError::MissingColumns`] before any write if the header
/// lacks an interchange column, or [`ImportError::Store`] if a write fails.
pub async fn import_sites(
    store: &dyn HeritageStore,
    rows: &CsvRows,
) -> Result<SiteImportSummary, ImportError> {
    rows.require_columns(&SITE_COLUMNS)?;

    let mut summary = SiteImportSummary::default();

    for (i, record) in rows.records().iter().enumerate() {
        let line = i + 1;
        match record {
            Ok(row) => import_row(store, row, line, &mut summary).await?,
            Err(e) => {
                log::warn!("Row {line}: malformed record skipped: {e}");
                summary.skipped_malformed += 1;
            }
        }

        if line % PROGRESS_EVERY == 0 {
            log::info!("[{line}] {summary}");
        }
    }

    log::info!("Site import finished. {summary}");
    Ok(summary)
}

async fn import_row(
    store: &dyn HeritageStore,
    row: &CsvRow,
    line: usize,
    summary: &mut SiteImportSummary,
) -> Result<(), ImportError> {
    let unesco_id = row.text("unesco_id");
    if unesco_id.is_empty() {
        log::warn!("Row {line}: missing unesco_id, skipped");
        summary.skipped_missing_id += 1;
        return Ok(());
    }

    let coordinates = parse_coordinates(
        row.first_non_blank(&["lat", "latitudine"]),
        row.first_non_blank(&["long", "longitudine"]),
    );
    let Some(coordinates) = coordinates else {
        log::warn!("Row {line}: site {unesco_id} has invalid coordinates, skipped");
        summary.skipped_invalid_coords += 1;
        return Ok(());
    };

    let category_name = row.text("categoria");
    let category_id = if category_name.is_empty() {
        None
    } else {
        Some(store.get_or_create_category(category_name).await?.id)
    };

    let flags = row.accessibility_flags();
    let note = row.text("note");
    let accessibility_id = if flags.has_data() || !note.is_empty() {
        Some(
            store
                .get_or_create_accessibility(flags, Some(note))
                .await?
                .id,
        )
    } else {
        None
    };

    let outcome = store
        .upsert_site(&SiteUpsert {
            unesco_id: unesco_id.to_string(),
            name: row.text("nome").to_string(),
            description: row.text("descrizione").to_string(),
            region: row.text("regione").to_string(),
            city: row.text("citta").to_string(),
            coordinates: Some(coordinates),
            inscription_year: parse_year(row.text("anno")),
            category_id,
            accessibility_id,
        })
        .await?;

    if outcome.created {
        summary.created += 1;
    } else {
        summary.updated += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use unesco_map_database::memory::MemoryStore;
    use unesco_map_database::{CategoryStore, SiteStore};
    use unesco_map_database_models::SiteQuery;
    use unesco_map_heritage_models::TriState;

    const HEADER: &str = "unesco_id,nome,descrizione,regione,citta,lat,long,categoria,anno,wheelchair,ausili_visivi,supporto_uditivo,note\n";

    fn csv(body: &str) -> CsvRows {
        CsvRows::from_reader(format!("{HEADER}{body}").as_bytes()).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[tokio::test]
    async fn imports_and_counts_rows() {
        let store = MemoryStore::new();
        let rows = csv(
            "91,Centro Storico,,Lazio,Roma,\"41,9\",\"12,49\",Culturale,1980,1,0,,rampa\n\
             ,Senza id,,Lazio,Roma,41.9,12.49,Culturale,1980,,,,\n\
             92,Senza coordinate,,Lazio,Roma,,,Culturale,1980,,,,\n\
             93,Fuori range,,Lazio,Roma,95,12,Culturale,,,,,\n",
        );

        let summary = import_sites(&store, &rows).await.unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped_missing_id, 1);
        assert_eq!(summary.skipped_invalid_coords, 2);

        let row = store.site_by_unesco_id("91").await.unwrap().unwrap();
        assert_eq!(row.category_name(), Some("Culturale"));
        assert_eq!(row.site.inscription_year, Some(1980));
        let acc = row.accessibility.unwrap();
        assert_eq!(acc.flags.wheelchair, TriState::Yes);
        assert_eq!(acc.flags.visual_aids, TriState::No);
        assert_eq!(acc.note.as_deref(), Some("rampa"));

        // Skipped rows leave no categories behind beyond the imported one
        assert_eq!(store.list_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reimport_updates_and_shares_accessibility() {
        let store = MemoryStore::new();
        let body = "1,A,,Lazio,Roma,41.9,12.49,,,1,,,\n2,B,,Lazio,Roma,41.8,12.4,,,yes,,,\n";
        import_sites(&store, &csv(body)).await.unwrap();
        let again = import_sites(&store, &csv(body)).await.unwrap();
        assert_eq!(again.created, 0);
        assert_eq!(again.updated, 2);

        let a = store.site_by_unesco_id("1").await.unwrap().unwrap();
        let b = store.site_by_unesco_id("2").await.unwrap().unwrap();
        assert_eq!(a.site.accessibility_id, b.site.accessibility_id);
        assert!(a.site.category_id.is_none());
    }

    #[tokio::test]
    async fn missing_columns_fail_before_writing() {
        let store = MemoryStore::new();
        let rows = CsvRows::from_reader("unesco_id,nome\n1,A\n".as_bytes()).unwrap();
        assert!(matches!(
            import_sites(&store, &rows).await,
            Err(ImportError::MissingColumns(_))
        ));
        assert!(store.site_by_unesco_id("1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn imported_flags_drive_site_filters() {
        let store = MemoryStore::new();
        let rows = csv("7,Villa,,Veneto,Vicenza,45.5,11.5,Culturale,1994,1,0,,\n");
        import_sites(&store, &rows).await.unwrap();

        let wheelchair = SiteQuery::from_params(&params(&[("wheelchair", "1")]));
        assert_eq!(store.query_sites(&wheelchair).await.unwrap().total, 1);

        let hearing_false = SiteQuery::from_params(&params(&[("supporto_uditivo", "0")]));
        assert_eq!(store.query_sites(&hearing_false).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn latitudine_columns_are_a_fallback() {
        let store = MemoryStore::new();
        let header = HEADER.trim_end().to_string() + ",latitudine,longitudine\n";
        let rows = CsvRows::from_reader(
            format!("{header}5,Sito,,Sicilia,Siracusa,,,,,,,,,\"37,07\",\"15,28\"\n").as_bytes(),
        )
        .unwrap();
        let summary = import_sites(&store, &rows).await.unwrap();
        assert_eq!(summary.created, 1);
        let site = store.site_by_unesco_id("5").await.unwrap().unwrap().site;
        assert!((site.coordinates.unwrap().latitude() - 37.07).abs() < f64::EPSILON);
    }
}
