//! Category normalization.

use std::fmt;

use serde::Serialize;
use unesco_map_database::{CategoryStore as _, HeritageStore};
use unesco_map_heritage_models::CanonicalCategory;

use crate::ImportError;

/// One non-canonical category folded into a canonical one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryMerge {
    /// Name of the removed category.
    pub from: String,
    /// Canonical category that received its sites.
    pub to: CanonicalCategory,
    /// Sites reassigned.
    pub sites: u64,
}

/// Outcome of [`normalize_categories`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// Merges in category name order.
    pub merges: Vec<CategoryMerge>,
    /// Total sites reassigned.
    pub reassigned: u64,
    /// Categories deleted.
    pub deleted: u64,
}

impl fmt::Display for NormalizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for merge in &self.merges {
            writeln!(f, "  {} -> {} ({} sites)", merge.from, merge.to, merge.sites)?;
        }
        write!(
            f,
            "reassigned sites: {} | deleted categories: {}",
            self.reassigned, self.deleted
        )
    }
}

/// Folds every category into "Culturale" or "Naturale".
///
/// Known spellings map to their canonical category; anything unrecognised
/// becomes "Culturale".
///
/// # Errors
///
/// Returns [`ImportError::Store`] if any store operation fails.
pub async fn normalize_categories(store: &dyn HeritageStore) -> Result<NormalizeReport, ImportError> {
    let culturale = store
        .get_or_create_category(&CanonicalCategory::Culturale.to_string())
        .await?;
    let naturale = store
        .get_or_create_category(&CanonicalCategory::Naturale.to_string())
        .await?;

    let mut report = NormalizeReport::default();

    for category in store.list_categories().await? {
        if category.id == culturale.id || category.id == naturale.id {
            continue;
        }

        let canonical =
            CanonicalCategory::normalize(&category.name).unwrap_or(CanonicalCategory::Culturale);
        let target = match canonical {
            CanonicalCategory::Culturale => culturale.id,
            CanonicalCategory::Naturale => naturale.id,
        };

        let sites = store.reassign_category_sites(category.id, target).await?;
        if store.delete_category(category.id).await? {
            report.deleted += 1;
        }
        report.reassigned += sites;

        log::info!("Merged category {:?} into {canonical} ({sites} sites)", category.name);
        report.merges.push(CategoryMerge {
            from: category.name,
            to: canonical,
            sites,
        });
    }

    log::info!(
        "Category normalization finished: {} reassigned, {} deleted",
        report.reassigned,
        report.deleted
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use unesco_map_database::memory::MemoryStore;
    use unesco_map_database::{CategoryStore, SiteStore};
    use unesco_map_database_models::{SiteQuery, SiteUpsert};
    use unesco_map_heritage_models::Coordinates;

    async fn add_site(store: &MemoryStore, unesco_id: &str, category: &str) {
        let category_id = store.get_or_create_category(category).await.unwrap().id;
        store
            .upsert_site(&SiteUpsert {
                unesco_id: unesco_id.to_string(),
                name: format!("Sito {unesco_id}"),
                description: String::new(),
                region: "Toscana".to_string(),
                city: "Firenze".to_string(),
                coordinates: Coordinates::new(43.77, 11.25).ok(),
                inscription_year: None,
                category_id: Some(category_id),
                accessibility_id: None,
            })
            .await
            .unwrap();
    }

    fn categoria(value: &str) -> SiteQuery {
        let params: BTreeMap<String, String> =
            [("categoria".to_string(), value.to_string())].into_iter().collect();
        SiteQuery::from_params(&params)
    }

    #[tokio::test]
    async fn merges_spellings_into_canonical_pair() {
        let store = MemoryStore::new();
        add_site(&store, "1", "cultural").await;
        add_site(&store, "2", "Culturale").await;
        add_site(&store, "3", "Natura").await;
        add_site(&store, "4", "Misto").await;

        let report = normalize_categories(&store).await.unwrap();
        assert_eq!(report.deleted, 3);
        assert_eq!(report.reassigned, 3);

        let names: Vec<String> = store
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Culturale".to_string(), "Naturale".to_string()]);

        let misto = report.merges.iter().find(|m| m.from == "Misto").unwrap();
        assert_eq!(misto.to, CanonicalCategory::Culturale);
    }

    #[tokio::test]
    async fn alias_and_canonical_filters_agree_after_merge() {
        let store = MemoryStore::new();
        add_site(&store, "1", "cultural").await;
        add_site(&store, "2", "Culturale").await;
        normalize_categories(&store).await.unwrap();

        let by_alias = store.query_sites(&categoria("cultural")).await.unwrap();
        let by_name = store.query_sites(&categoria("Culturale")).await.unwrap();
        assert_eq!(by_alias.total, 2);
        assert_eq!(by_alias, by_name);
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let store = MemoryStore::new();
        add_site(&store, "1", "naturali").await;
        normalize_categories(&store).await.unwrap();
        let again = normalize_categories(&store).await.unwrap();
        assert!(again.merges.is_empty());
        assert_eq!(again.to_string(), "reassigned sites: 0 | deleted categories: 0");
    }
}
