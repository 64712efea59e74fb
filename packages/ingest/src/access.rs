//! Accessibility CSV import.

use std::fmt;

use serde::Serialize;
use unesco_map_database::{AccessibilityStore as _, HeritageStore, SiteStore as _};

use crate::ImportError;
use crate::rows::CsvRows;

/// Number of unmatched keys echoed in reports.
pub const MISSING_REPORT_LIMIT: usize = 10;

/// Column used to find the site a row refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOn {
    /// Match `unesco_id` exactly.
    #[default]
    #[value(name = "unesco_id")]
    UnescoId,
    /// Match the site name (`nome`) exactly.
    #[value(name = "nome")]
    Nome,
}

impl MatchOn {
    /// CSV column holding the key.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::UnescoId => "unesco_id",
            Self::Nome => "nome",
        }
    }
}

/// Counters reported by [`import_access`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessImportSummary {
    /// Sites that had no accessibility record before.
    pub created: u64,
    /// Sites whose existing record was replaced.
    pub updated: u64,
    /// Rows with a blank key or an undecodable record.
    pub skipped: u64,
    /// Keys that matched no site, in file order.
    pub missing: Vec<String>,
}

impl fmt::Display for AccessImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created: {} | updated: {} | skipped: {} | sites not found: {}",
            self.created,
            self.updated,
            self.skipped,
            self.missing.len(),
        )?;
        if !self.missing.is_empty() {
            let shown: Vec<&str> = self
                .missing
                .iter()
                .take(MISSING_REPORT_LIMIT)
                .map(String::as_str)
                .collect();
            write!(
                f,
                "\nnot found (first {MISSING_REPORT_LIMIT}): {}",
                shown.join(", ")
            )?;
        }
        Ok(())
    }
}

/// Points each matched site at the shared accessibility record for the
/// row's flag triple.
///
/// Records are never mutated in place: several sites may share one, so a
/// site whose flags change is re-pointed rather than editing the record
/// under its neighbours.
///
/// # Errors
///
/// Returns [`ImportError::Store`] if a lookup or write fails.
pub async fn import_access(
    store: &dyn HeritageStore,
    rows: &CsvRows,
    match_on: MatchOn,
) -> Result<AccessImportSummary, ImportError> {
    let mut summary = AccessImportSummary::default();

    for (i, record) in rows.records().iter().enumerate() {
        let line = i + 1;
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                log::warn!("Row {line}: malformed record skipped: {e}");
                summary.skipped += 1;
                continue;
            }
        };

        let key = row.text(match_on.column());
        if key.is_empty() {
            summary.skipped += 1;
            continue;
        }

        let site = match match_on {
            MatchOn::UnescoId => store.site_by_unesco_id(key).await?,
            MatchOn::Nome => store.site_by_name(key).await?,
        };
        let Some(site) = site else {
            log::warn!("Row {line}: no site matches {} {key:?}", match_on.column());
            summary.missing.push(key.to_string());
            continue;
        };

        let record = store
            .get_or_create_accessibility(row.accessibility_flags(), None)
            .await?;
        store.set_site_accessibility(site.site.id, Some(record.id)).await?;

        if site.site.accessibility_id.is_some() {
            summary.updated += 1;
        } else {
            summary.created += 1;
        }
    }

    log::info!("Accessibility import finished. {summary}");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use unesco_map_database::SiteStore;
    use unesco_map_database::memory::MemoryStore;
    use unesco_map_database_models::SiteUpsert;
    use unesco_map_heritage_models::{Coordinates, TriState};

    async fn seed(store: &MemoryStore, unesco_id: &str, name: &str) {
        store
            .upsert_site(&SiteUpsert {
                unesco_id: unesco_id.to_string(),
                name: name.to_string(),
                description: String::new(),
                region: "Campania".to_string(),
                city: "Napoli".to_string(),
                coordinates: Coordinates::new(40.85, 14.26).ok(),
                inscription_year: None,
                category_id: None,
                accessibility_id: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn counts_created_updated_and_missing() {
        let store = MemoryStore::new();
        seed(&store, "726", "Centro storico di Napoli").await;

        let first = CsvRows::from_reader(
            "unesco_id,wheelchair,ausili_visivi,supporto_uditivo\n726,1,,\n,1,1,1\n999,0,0,0\n"
                .as_bytes(),
        )
        .unwrap();
        let summary = import_access(&store, &first, MatchOn::UnescoId).await.unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.missing, vec!["999".to_string()]);

        let second = CsvRows::from_reader(
            "unesco_id,wheelchair,ausili_visivi,supporto_uditivo\n726,1,1,no\n".as_bytes(),
        )
        .unwrap();
        let summary = import_access(&store, &second, MatchOn::UnescoId).await.unwrap();
        assert_eq!(summary.updated, 1);

        let flags = store
            .site_by_unesco_id("726")
            .await
            .unwrap()
            .unwrap()
            .accessibility_flags();
        assert_eq!(flags.visual_aids, TriState::Yes);
        assert_eq!(flags.hearing_support, TriState::No);
    }

    #[tokio::test]
    async fn matches_on_exact_name() {
        let store = MemoryStore::new();
        seed(&store, "1", "Pompei").await;
        let rows = CsvRows::from_reader(
            "nome,wheelchair,ausili_visivi,supporto_uditivo\nPompei,si,,\npompei,si,,\n".as_bytes(),
        )
        .unwrap();
        let summary = import_access(&store, &rows, MatchOn::Nome).await.unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.missing, vec!["pompei".to_string()]);
    }

    #[test]
    fn report_truncates_missing_keys() {
        let summary = AccessImportSummary {
            missing: (1..=12).map(|i| i.to_string()).collect(),
            ..AccessImportSummary::default()
        };
        let text = summary.to_string();
        assert!(text.contains("sites not found: 12"));
        assert!(text.contains("1, 2, 3"));
        assert!(!text.contains("11"));
    }
}
