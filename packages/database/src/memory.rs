//! In-memory [`HeritageStore`](crate::HeritageStore) implementation.
//!
//! Mirrors the `SQLite` schema's constraints (unique names and keys, foreign
//! key actions) closely enough for handler and import tests. Site queries
//! are evaluated with [`SiteQuery::apply`], the row-level counterpart of
//! [`crate::filter::render`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use unesco_map_database_models::{
    ItineraryAccessibility, ItineraryPage, ItinerarySummary, PageRequest, SiteLocationUpdate,
    SitePage, SiteQuery, SiteRow, SiteUpsert, StopRow, UpsertOutcome,
};
use unesco_map_heritage_models::{
    Accessibility, AccessibilityFlags, Booking, Category, FollowRecord, FollowStatus, Itinerary,
    NewBooking, Site, Stop,
};

use crate::DbError;
use crate::store::{AccessibilityStore, CategoryStore, ItineraryStore, SiteStore};

#[derive(Debug, Default)]
struct State {
    last_id: i64,
    categories: BTreeMap<i64, Category>,
    accessibility: BTreeMap<i64, Accessibility>,
    sites: BTreeMap<i64, Site>,
    itineraries: BTreeMap<i64, Itinerary>,
    stops: BTreeMap<i64, Stop>,
    follows: BTreeMap<(String, i64), FollowRecord>,
    bookings: BTreeMap<i64, Booking>,
}

impl State {
    const fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn site_row(&self, site: &Site) -> SiteRow {
        SiteRow {
            site: site.clone(),
            category: site
                .category_id
                .and_then(|id| self.categories.get(&id))
                .cloned(),
            accessibility: site
                .accessibility_id
                .and_then(|id| self.accessibility.get(&id))
                .cloned(),
        }
    }

    fn find_site(&self, predicate: impl Fn(&Site) -> bool) -> Option<SiteRow> {
        self.sites
            .values()
            .find(|s| predicate(s))
            .map(|s| self.site_row(s))
    }

    fn check_references(&self, site: &SiteUpsert) -> Result<(), DbError> {
        if let Some(id) = site.category_id
            && !self.categories.contains_key(&id)
        {
            return Err(DbError::Constraint(format!("category {id} does not exist")));
        }
        if let Some(id) = site.accessibility_id
            && !self.accessibility.contains_key(&id)
        {
            return Err(DbError::Constraint(format!(
                "accessibility {id} does not exist"
            )));
        }
        Ok(())
    }

    fn stops_of(&self, itinerary_id: i64) -> Vec<&Stop> {
        let mut stops: Vec<&Stop> = self
            .stops
            .values()
            .filter(|s| s.itinerary_id == itinerary_id)
            .collect();
        stops.sort_by_key(|s| s.order);
        stops
    }

    fn itinerary_accessibility(&self, itinerary_id: i64) -> ItineraryAccessibility {
        let flags: Vec<AccessibilityFlags> = self
            .stops_of(itinerary_id)
            .into_iter()
            .filter_map(|stop| self.sites.get(&stop.site_id))
            .filter_map(|site| site.accessibility_id)
            .filter_map(|id| self.accessibility.get(&id))
            .map(|a| a.flags)
            .collect();
        ItineraryAccessibility::from_flags(&flags)
    }
}

/// A [`HeritageStore`](crate::HeritageStore) kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SiteStore for MemoryStore {
    async fn query_sites(&self, query: &SiteQuery) -> Result<SitePage, DbError> {
        let state = self.state();
        Ok(query.apply(state.sites.values().map(|s| state.site_row(s))))
    }

    async fn site_by_unesco_id(&self, unesco_id: &str) -> Result<Option<SiteRow>, DbError> {
        Ok(self.state().find_site(|s| s.unesco_id == unesco_id))
    }

    async fn site_by_name(&self, name: &str) -> Result<Option<SiteRow>, DbError> {
        Ok(self.state().find_site(|s| s.name == name))
    }

    async fn first_site_name_containing(
        &self,
        keyword: &str,
    ) -> Result<Option<SiteRow>, DbError> {
        let keyword = keyword.to_lowercase();
        Ok(self
            .state()
            .find_site(|s| s.name.to_lowercase().contains(&keyword)))
    }

    async fn upsert_site(&self, site: &SiteUpsert) -> Result<UpsertOutcome, DbError> {
        let mut state = self.state();
        state.check_references(site)?;

        let existing = state
            .sites
            .values()
            .find(|s| s.unesco_id == site.unesco_id)
            .map(|s| s.id);
        let (id, created) = match existing {
            Some(id) => (id, false),
            None => (state.next_id(), true),
        };

        state.sites.insert(
            id,
            Site {
                id,
                unesco_id: site.unesco_id.clone(),
                name: site.name.clone(),
                description: site.description.clone(),
                region: site.region.clone(),
                city: site.city.clone(),
                coordinates: site.coordinates,
                inscription_year: site.inscription_year,
                category_id: site.category_id,
                accessibility_id: site.accessibility_id,
            },
        );

        Ok(UpsertOutcome { id, created })
    }

    async fn update_site_location(
        &self,
        unesco_id: &str,
        update: &SiteLocationUpdate,
    ) -> Result<bool, DbError> {
        if update.is_empty() {
            return Ok(false);
        }
        let mut state = self.state();
        let Some(site) = state.sites.values_mut().find(|s| s.unesco_id == unesco_id) else {
            return Ok(false);
        };
        if let Some(coordinates) = update.coordinates {
            site.coordinates = Some(coordinates);
        }
        if let Some(city) = &update.city {
            site.city.clone_from(city);
        }
        if let Some(region) = &update.region {
            site.region.clone_from(region);
        }
        Ok(true)
    }

    async fn set_site_accessibility(
        &self,
        site_id: i64,
        accessibility_id: Option<i64>,
    ) -> Result<(), DbError> {
        let mut state = self.state();
        if let Some(id) = accessibility_id
            && !state.accessibility.contains_key(&id)
        {
            return Err(DbError::Constraint(format!(
                "accessibility {id} does not exist"
            )));
        }
        if let Some(site) = state.sites.get_mut(&site_id) {
            site.accessibility_id = accessibility_id;
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, DbError> {
        let mut categories: Vec<Category> = self.state().categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn get_or_create_category(&self, name: &str) -> Result<Category, DbError> {
        let mut state = self.state();
        if let Some(category) = state.categories.values().find(|c| c.name == name) {
            return Ok(category.clone());
        }
        let id = state.next_id();
        let category = Category {
            id,
            name: name.to_string(),
            description: String::new(),
        };
        state.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn reassign_category_sites(&self, from: i64, to: i64) -> Result<u64, DbError> {
        let mut state = self.state();
        if !state.categories.contains_key(&to) {
            return Err(DbError::Constraint(format!("category {to} does not exist")));
        }
        let mut moved = 0;
        for site in state.sites.values_mut() {
            if site.category_id == Some(from) {
                site.category_id = Some(to);
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn count_sites_in_category(&self, category_id: i64) -> Result<u64, DbError> {
        Ok(self
            .state()
            .sites
            .values()
            .filter(|s| s.category_id == Some(category_id))
            .count() as u64)
    }

    async fn delete_category(&self, category_id: i64) -> Result<bool, DbError> {
        let mut state = self.state();
        if state.categories.remove(&category_id).is_none() {
            return Ok(false);
        }
        for site in state.sites.values_mut() {
            if site.category_id == Some(category_id) {
                site.category_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl AccessibilityStore for MemoryStore {
    async fn get_or_create_accessibility(
        &self,
        flags: AccessibilityFlags,
        note: Option<&str>,
    ) -> Result<Accessibility, DbError> {
        let note = note.map(str::trim).filter(|n| !n.is_empty());
        let mut state = self.state();

        if let Some(record) = state.accessibility.values_mut().find(|a| a.flags == flags) {
            if let Some(note) = note
                && record.note.as_deref() != Some(note)
            {
                record.note = Some(note.to_string());
            }
            return Ok(record.clone());
        }

        let id = state.next_id();
        let record = Accessibility {
            id,
            flags,
            note: note.map(str::to_string),
        };
        state.accessibility.insert(id, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl ItineraryStore for MemoryStore {
    async fn list_itineraries(&self, page: PageRequest) -> Result<ItineraryPage, DbError> {
        let state = self.state();
        let mut itineraries: Vec<&Itinerary> = state.itineraries.values().collect();
        itineraries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(page.per_page).unwrap_or(usize::MAX);
        let items = itineraries
            .iter()
            .skip(skip)
            .take(take)
            .map(|itinerary| ItinerarySummary {
                itinerary: (*itinerary).clone(),
                accessibility: state.itinerary_accessibility(itinerary.id),
            })
            .collect();

        Ok(ItineraryPage {
            items,
            total: itineraries.len() as u64,
        })
    }

    async fn get_itinerary(&self, id: i64) -> Result<Option<Itinerary>, DbError> {
        Ok(self.state().itineraries.get(&id).cloned())
    }

    async fn itinerary_stops(&self, itinerary_id: i64) -> Result<Vec<StopRow>, DbError> {
        let state = self.state();
        Ok(state
            .stops_of(itinerary_id)
            .into_iter()
            .filter_map(|stop| {
                state.sites.get(&stop.site_id).map(|site| StopRow {
                    order: stop.order,
                    site: state.site_row(site),
                })
            })
            .collect())
    }

    async fn get_or_create_itinerary(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Itinerary, DbError> {
        let mut state = self.state();
        if let Some(itinerary) = state.itineraries.values().find(|i| i.name == name) {
            return Ok(itinerary.clone());
        }
        let id = state.next_id();
        let itinerary = Itinerary {
            id,
            name: name.to_string(),
            description: description.to_string(),
        };
        state.itineraries.insert(id, itinerary.clone());
        Ok(itinerary)
    }

    async fn clear_stops(&self, itinerary_id: i64) -> Result<u64, DbError> {
        let mut state = self.state();
        let before = state.stops.len();
        state.stops.retain(|_, s| s.itinerary_id != itinerary_id);
        Ok((before - state.stops.len()) as u64)
    }

    async fn add_stop(
        &self,
        itinerary_id: i64,
        site_id: i64,
        order: u32,
    ) -> Result<Stop, DbError> {
        let mut state = self.state();
        if !state.itineraries.contains_key(&itinerary_id) {
            return Err(DbError::Constraint(format!(
                "itinerary {itinerary_id} does not exist"
            )));
        }
        if !state.sites.contains_key(&site_id) {
            return Err(DbError::Constraint(format!("site {site_id} does not exist")));
        }
        if state
            .stops
            .values()
            .any(|s| s.itinerary_id == itinerary_id && s.order == order)
        {
            return Err(DbError::Constraint(format!(
                "itinerary {itinerary_id} already has a stop at position {order}"
            )));
        }
        let id = state.next_id();
        let stop = Stop {
            id,
            itinerary_id,
            site_id,
            order,
        };
        state.stops.insert(id, stop);
        Ok(stop)
    }

    async fn toggle_follow(&self, user: &str, itinerary_id: i64) -> Result<FollowStatus, DbError> {
        let mut state = self.state();
        if !state.itineraries.contains_key(&itinerary_id) {
            return Err(DbError::Constraint(format!(
                "itinerary {itinerary_id} does not exist"
            )));
        }
        let key = (user.to_string(), itinerary_id);
        if state.follows.remove(&key).is_some() {
            return Ok(FollowStatus::Removed);
        }
        state.follows.insert(
            key,
            FollowRecord {
                user: user.to_string(),
                itinerary_id,
                created_at: Utc::now(),
            },
        );
        Ok(FollowStatus::Added)
    }

    async fn followed_itineraries(
        &self,
        user: &str,
        itinerary_ids: &[i64],
    ) -> Result<BTreeSet<i64>, DbError> {
        let state = self.state();
        Ok(itinerary_ids
            .iter()
            .copied()
            .filter(|id| state.follows.contains_key(&(user.to_string(), *id)))
            .collect())
    }

    async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, DbError> {
        let mut state = self.state();
        if !state.itineraries.contains_key(&booking.itinerary_id) {
            return Err(DbError::Constraint(format!(
                "itinerary {} does not exist",
                booking.itinerary_id
            )));
        }
        if booking.party_size < 1 {
            return Err(DbError::Constraint("party size must be at least 1".to_string()));
        }
        let id = state.next_id();
        let stored = Booking {
            id,
            itinerary_id: booking.itinerary_id,
            name: booking.name.trim().to_string(),
            email: booking.email.trim().to_string(),
            date: booking.date,
            party_size: booking.party_size,
            note: booking.note.clone(),
            created_at: Utc::now(),
        };
        state.bookings.insert(id, stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unesco_map_database_models::Pagination;
    use unesco_map_heritage_models::{Coordinates, TriState};

    fn upsert(unesco_id: &str, name: &str, city: &str) -> SiteUpsert {
        SiteUpsert {
            unesco_id: unesco_id.to_string(),
            name: name.to_string(),
            description: String::new(),
            region: "Lazio".to_string(),
            city: city.to_string(),
            coordinates: Coordinates::new(41.9, 12.49).ok(),
            inscription_year: Some(1980),
            category_id: None,
            accessibility_id: None,
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_updates_by_unesco_id() {
        let store = MemoryStore::new();
        let first = store.upsert_site(&upsert("91", "Centro Storico", "Roma")).await.unwrap();
        assert!(first.created);

        let second = store
            .upsert_site(&upsert("91", "Centro Storico di Roma", "Roma"))
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(first.id, second.id);

        let row = store.site_by_unesco_id("91").await.unwrap().unwrap();
        assert_eq!(row.site.name, "Centro Storico di Roma");
    }

    #[tokio::test]
    async fn upsert_rejects_dangling_category() {
        let store = MemoryStore::new();
        let mut site = upsert("1", "A", "Roma");
        site.category_id = Some(999);
        assert!(matches!(
            store.upsert_site(&site).await,
            Err(DbError::Constraint(_))
        ));
    }

    #[tokio::test]
    async fn accessibility_is_shared_by_flag_triple() {
        let store = MemoryStore::new();
        let flags = AccessibilityFlags::new(TriState::Yes, TriState::No, TriState::Unknown);
        let a = store.get_or_create_accessibility(flags, None).await.unwrap();
        let b = store
            .get_or_create_accessibility(flags, Some("rampa laterale"))
            .await
            .unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.note.as_deref(), Some("rampa laterale"));

        let c = store
            .get_or_create_accessibility(flags, Some("  "))
            .await
            .unwrap();
        assert_eq!(c.note.as_deref(), Some("rampa laterale"));

        let other = store
            .get_or_create_accessibility(AccessibilityFlags::default(), None)
            .await
            .unwrap();
        assert_ne!(other.id, a.id);
    }

    #[tokio::test]
    async fn deleting_category_nulls_site_reference() {
        let store = MemoryStore::new();
        let category = store.get_or_create_category("cultural").await.unwrap();
        let mut site = upsert("1", "A", "Roma");
        site.category_id = Some(category.id);
        store.upsert_site(&site).await.unwrap();

        assert_eq!(store.count_sites_in_category(category.id).await.unwrap(), 1);
        assert!(store.delete_category(category.id).await.unwrap());
        let row = store.site_by_unesco_id("1").await.unwrap().unwrap();
        assert_eq!(row.site.category_id, None);
        assert!(row.category.is_none());
    }

    #[tokio::test]
    async fn query_counts_all_matches_and_pages_by_id() {
        let store = MemoryStore::new();
        for i in 1..=5 {
            store
                .upsert_site(&upsert(&i.to_string(), &format!("Sito {i}"), "Roma"))
                .await
                .unwrap();
        }
        let query = SiteQuery::builder()
            .search("sito")
            .pagination(Pagination::new(2, 1))
            .build();
        let page = store.query_sites(&query).await.unwrap();
        assert_eq!(page.total, 5);
        let names: Vec<&str> = page.rows.iter().map(|r| r.site.name.as_str()).collect();
        assert_eq!(names, vec!["Sito 2", "Sito 3"]);
    }

    #[tokio::test]
    async fn stop_order_is_unique_per_itinerary() {
        let store = MemoryStore::new();
        let site = store.upsert_site(&upsert("1", "A", "Roma")).await.unwrap();
        let itinerary = store.get_or_create_itinerary("Giro", "").await.unwrap();
        store.add_stop(itinerary.id, site.id, 1).await.unwrap();
        assert!(matches!(
            store.add_stop(itinerary.id, site.id, 1).await,
            Err(DbError::Constraint(_))
        ));
        assert_eq!(store.clear_stops(itinerary.id).await.unwrap(), 1);
        assert!(store.itinerary_stops(itinerary.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_follow_twice_returns_to_unfollowed() {
        let store = MemoryStore::new();
        let itinerary = store.get_or_create_itinerary("Giro", "").await.unwrap();

        assert_eq!(
            store.toggle_follow("mario", itinerary.id).await.unwrap(),
            FollowStatus::Added
        );
        assert!(
            store
                .followed_itineraries("mario", &[itinerary.id])
                .await
                .unwrap()
                .contains(&itinerary.id)
        );
        assert_eq!(
            store.toggle_follow("mario", itinerary.id).await.unwrap(),
            FollowStatus::Removed
        );
        assert!(
            store
                .followed_itineraries("mario", &[itinerary.id])
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn itinerary_listing_is_sorted_with_derived_flags() {
        let store = MemoryStore::new();
        let accessible = store
            .get_or_create_accessibility(
                AccessibilityFlags::new(TriState::Yes, TriState::Unknown, TriState::No),
                None,
            )
            .await
            .unwrap();
        let mut site = upsert("1", "A", "Roma");
        site.accessibility_id = Some(accessible.id);
        let site = store.upsert_site(&site).await.unwrap();

        let zeta = store.get_or_create_itinerary("Zeta", "").await.unwrap();
        let alpha = store.get_or_create_itinerary("Alpha", "").await.unwrap();
        store.add_stop(zeta.id, site.id, 1).await.unwrap();

        let page = store
            .list_itineraries(PageRequest::from_param(None))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].itinerary.id, alpha.id);
        assert_eq!(page.items[0].accessibility, ItineraryAccessibility::default());
        assert!(page.items[1].accessibility.wheelchair);
        assert!(!page.items[1].accessibility.hearing_support);

        let past_end = store
            .list_itineraries(PageRequest::from_param(Some("5")))
            .await
            .unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 2);
    }
}
