//! Demo itinerary seeding.

use std::fmt;

use serde::Serialize;
use unesco_map_database::{HeritageStore, ItineraryStore as _, SiteStore as _};

use crate::ImportError;

/// A demo itinerary and the site-name keywords of its stops, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoItinerary {
    /// Itinerary name, used as the lookup key.
    pub name: &'static str,
    /// Description used when the itinerary is first created.
    pub description: &'static str,
    /// Substrings matched against site names.
    pub keywords: &'static [&'static str],
}

/// The itineraries created by [`seed_itineraries`].
pub const DEMO_ITINERARIES: [DemoItinerary; 3] = [
    DemoItinerary {
        name: "Città d\u{2019}arte del Nord",
        description: "Percorso tra alcune città d\u{2019}arte del Nord Italia",
        keywords: &["Turin", "Milan", "Bergamo", "Verona", "Venice"],
    },
    DemoItinerary {
        name: "Cuore del Rinascimento",
        description: "Tra i capolavori del Rinascimento italiano",
        keywords: &["Florence", "Siena", "Urbino", "Ferrara"],
    },
    DemoItinerary {
        name: "Sud & Isole",
        description: "Siti imperdibili del Sud Italia e delle isole",
        keywords: &["Naples", "Matera", "Palermo", "Agrigento", "Syracuse"],
    },
];

/// What happened to one demo itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeededItinerary {
    /// Itinerary id.
    pub id: i64,
    /// Itinerary name.
    pub name: String,
    /// Stops created.
    pub stops: u32,
    /// Keywords that matched no site.
    pub unmatched: Vec<String>,
}

/// Outcome of [`seed_itineraries`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// One entry per demo itinerary.
    pub itineraries: Vec<SeededItinerary>,
}

impl fmt::Display for SeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for itinerary in &self.itineraries {
            write!(f, "  {}: {} stops", itinerary.name, itinerary.stops)?;
            if !itinerary.unmatched.is_empty() {
                write!(f, " (no match for {})", itinerary.unmatched.join(", "))?;
            }
            writeln!(f)?;
        }
        write!(f, "seeded itineraries: {}", self.itineraries.len())
    }
}

/// Rebuilds the stops of every [`DEMO_ITINERARIES`] entry.
///
/// Existing stops are cleared first. Each keyword selects the lowest-id site
/// whose name contains it; the stop order is the keyword's position from 1,
/// so a keyword without a match leaves a gap.
///
/// # Errors
///
/// Returns [`ImportError::Store`] if any store operation fails.
pub async fn seed_itineraries(store: &dyn HeritageStore) -> Result<SeedReport, ImportError> {
    let mut report = SeedReport::default();

    for demo in &DEMO_ITINERARIES {
        let itinerary = store
            .get_or_create_itinerary(demo.name, demo.description)
            .await?;
        let cleared = store.clear_stops(itinerary.id).await?;
        log::debug!("Cleared {cleared} stops from {:?}", itinerary.name);

        let mut seeded = SeededItinerary {
            id: itinerary.id,
            name: itinerary.name.clone(),
            stops: 0,
            unmatched: vec![],
        };

        for (order, keyword) in (1..).zip(demo.keywords) {
            match store.first_site_name_containing(keyword).await? {
                Some(site) => {
                    store.add_stop(itinerary.id, site.site.id, order).await?;
                    seeded.stops += 1;
                }
                None => {
                    log::warn!("No site matches {keyword:?} for {:?}", itinerary.name);
                    seeded.unmatched.push((*keyword).to_string());
                }
            }
        }

        log::info!("Seeded {:?} with {} stops", itinerary.name, seeded.stops);
        report.itineraries.push(seeded);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use unesco_map_database::memory::MemoryStore;
    use unesco_map_database::{ItineraryStore, SiteStore};
    use unesco_map_database_models::SiteUpsert;
    use unesco_map_heritage_models::Coordinates;

    async fn add_site(store: &MemoryStore, unesco_id: &str, name: &str) {
        store
            .upsert_site(&SiteUpsert {
                unesco_id: unesco_id.to_string(),
                name: name.to_string(),
                description: String::new(),
                region: String::new(),
                city: String::new(),
                coordinates: Coordinates::new(42.0, 12.0).ok(),
                inscription_year: None,
                category_id: None,
                accessibility_id: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stops_follow_keyword_positions() {
        let store = MemoryStore::new();
        add_site(&store, "1", "Residences of the Royal House of Savoy, Turin").await;
        add_site(&store, "2", "City of Verona").await;
        add_site(&store, "3", "Venice and its Lagoon").await;

        let report = seed_itineraries(&store).await.unwrap();
        let north = &report.itineraries[0];
        assert_eq!(north.stops, 3);
        assert_eq!(north.unmatched, vec!["Milan".to_string(), "Bergamo".to_string()]);

        let stops = store.itinerary_stops(north.id).await.unwrap();
        let orders: Vec<u32> = stops.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 4, 5]);
        assert_eq!(stops[1].site.site.name, "City of Verona");
    }

    #[tokio::test]
    async fn reseeding_replaces_stops() {
        let store = MemoryStore::new();
        add_site(&store, "1", "Historic Centre of Florence").await;
        add_site(&store, "2", "historic centre of florence (annex)").await;

        let first = seed_itineraries(&store).await.unwrap();
        let second = seed_itineraries(&store).await.unwrap();
        assert_eq!(first.itineraries[1].id, second.itineraries[1].id);

        let stops = store.itinerary_stops(second.itineraries[1].id).await.unwrap();
        assert_eq!(stops.len(), 1);
        assert_eq!(stops[0].site.site.unesco_id, "1");
    }
}
