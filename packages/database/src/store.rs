//! Store abstractions over the heritage catalog.
//!
//! Callers depend on these traits rather than on a concrete database, so the
//! same handler or import routine runs against [`SqlStore`] in production
//! and [`crate::memory::MemoryStore`] in tests.

use std::collections::BTreeSet;
use std::ops::Deref;

use async_trait::async_trait;
use switchy_database::Database;
use unesco_map_database_models::{
    ItineraryPage, PageRequest, SiteLocationUpdate, SitePage, SiteQuery, SiteRow, SiteUpsert,
    StopRow, UpsertOutcome,
};
use unesco_map_heritage_models::{
    Accessibility, AccessibilityFlags, Booking, Category, FollowStatus, Itinerary, NewBooking,
    Stop,
};

use crate::{DbError, itineraries, queries};

/// Reads and writes heritage sites.
#[async_trait]
pub trait SiteStore: Send + Sync {
    /// Runs a filtered, paginated query ordered by site id.
    async fn query_sites(&self, query: &SiteQuery) -> Result<SitePage, DbError>;

    /// Looks up a site by UNESCO identifier.
    async fn site_by_unesco_id(&self, unesco_id: &str) -> Result<Option<SiteRow>, DbError>;

    /// Looks up a site by exact name (lowest id wins).
    async fn site_by_name(&self, name: &str) -> Result<Option<SiteRow>, DbError>;

    /// Lowest-id site whose name contains `keyword`, ignoring case.
    async fn first_site_name_containing(&self, keyword: &str)
    -> Result<Option<SiteRow>, DbError>;

    /// Creates or overwrites a site by UNESCO identifier.
    async fn upsert_site(&self, site: &SiteUpsert) -> Result<UpsertOutcome, DbError>;

    /// Applies a partial location update. Returns `true` if a site changed.
    async fn update_site_location(
        &self,
        unesco_id: &str,
        update: &SiteLocationUpdate,
    ) -> Result<bool, DbError>;

    /// Points a site at an accessibility record, or clears the reference.
    async fn set_site_accessibility(
        &self,
        site_id: i64,
        accessibility_id: Option<i64>,
    ) -> Result<(), DbError>;
}

/// Reads and writes categories.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// All categories ordered by name.
    async fn list_categories(&self) -> Result<Vec<Category>, DbError>;

    /// The category named exactly `name`, created if missing.
    async fn get_or_create_category(&self, name: &str) -> Result<Category, DbError>;

    /// Moves every site from one category to another; returns the count.
    async fn reassign_category_sites(&self, from: i64, to: i64) -> Result<u64, DbError>;

    /// Number of sites referencing a category.
    async fn count_sites_in_category(&self, category_id: i64) -> Result<u64, DbError>;

    /// Deletes a category, nulling site references. Returns `true` if deleted.
    async fn delete_category(&self, category_id: i64) -> Result<bool, DbError>;
}

/// Reads and writes shared accessibility records.
#[async_trait]
pub trait AccessibilityStore: Send + Sync {
    /// The record for this flag triple, created if missing. A non-blank
    /// `note` differing from the stored one replaces it.
    async fn get_or_create_accessibility(
        &self,
        flags: AccessibilityFlags,
        note: Option<&str>,
    ) -> Result<Accessibility, DbError>;
}

/// Reads and writes itineraries, stops, follows, and bookings.
#[async_trait]
pub trait ItineraryStore: Send + Sync {
    /// One page of itineraries ordered by name, with derived flags.
    async fn list_itineraries(&self, page: PageRequest) -> Result<ItineraryPage, DbError>;

    /// An itinerary by id.
    async fn get_itinerary(&self, id: i64) -> Result<Option<Itinerary>, DbError>;

    /// An itinerary's stops with their sites, in stop order.
    async fn itinerary_stops(&self, itinerary_id: i64) -> Result<Vec<StopRow>, DbError>;

    /// The lowest-id itinerary named `name`, created if missing.
    async fn get_or_create_itinerary(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Itinerary, DbError>;

    /// Removes all stops of an itinerary; returns the count.
    async fn clear_stops(&self, itinerary_id: i64) -> Result<u64, DbError>;

    /// Adds a stop at `order`, which must be unused in that itinerary.
    async fn add_stop(&self, itinerary_id: i64, site_id: i64, order: u32)
    -> Result<Stop, DbError>;

    /// Follows or unfollows an itinerary for `user`.
    async fn toggle_follow(&self, user: &str, itinerary_id: i64) -> Result<FollowStatus, DbError>;

    /// The subset of `itinerary_ids` followed by `user`.
    async fn followed_itineraries(
        &self,
        user: &str,
        itinerary_ids: &[i64],
    ) -> Result<BTreeSet<i64>, DbError>;

    /// Stores a validated booking.
    async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, DbError>;
}

/// Every store capability in one object-safe bundle.
pub trait HeritageStore: SiteStore + CategoryStore + AccessibilityStore + ItineraryStore {}

impl<T> HeritageStore for T where
    T: SiteStore + CategoryStore + AccessibilityStore + ItineraryStore + ?Sized
{
}

/// [`HeritageStore`] backed by a `switchy_database` connection.
///
/// `D` is anything that dereferences to a [`Database`]: the owned
/// connection returned by [`crate::db::open_db`], or a borrowed transaction
/// handle for batch imports.
#[derive(Debug)]
pub struct SqlStore<D = Box<dyn Database>> {
    db: D,
}

impl<D> SqlStore<D>
where
    D: Deref<Target = dyn Database> + Send + Sync,
{
    /// Wraps a connection.
    pub const fn new(db: D) -> Self {
        Self { db }
    }

    /// The underlying connection.
    pub fn database(&self) -> &dyn Database {
        &*self.db
    }
}

#[async_trait]
impl<D> SiteStore for SqlStore<D>
where
    D: Deref<Target = dyn Database> + Send + Sync,
{
    async fn query_sites(&self, query: &SiteQuery) -> Result<SitePage, DbError> {
        queries::query_sites(self.database(), query).await
    }

    async fn site_by_unesco_id(&self, unesco_id: &str) -> Result<Option<SiteRow>, DbError> {
        queries::site_by_unesco_id(self.database(), unesco_id).await
    }

    async fn site_by_name(&self, name: &str) -> Result<Option<SiteRow>, DbError> {
        queries::site_by_name(self.database(), name).await
    }

    async fn first_site_name_containing(
        &self,
        keyword: &str,
    ) -> Result<Option<SiteRow>, DbError> {
        queries::first_site_name_containing(self.database(), keyword).await
    }

    async fn upsert_site(&self, site: &SiteUpsert) -> Result<UpsertOutcome, DbError> {
        queries::upsert_site(self.database(), site).await
    }

    async fn update_site_location(
        &self,
        unesco_id: &str,
        update: &SiteLocationUpdate,
    ) -> Result<bool, DbError> {
        queries::update_site_location(self.database(), unesco_id, update).await
    }

    async fn set_site_accessibility(
        &self,
        site_id: i64,
        accessibility_id: Option<i64>,
    ) -> Result<(), DbError> {
        queries::set_site_accessibility(self.database(), site_id, accessibility_id).await
    }
}

#[async_trait]
impl<D> CategoryStore for SqlStore<D>
where
    D: Deref<Target = dyn Database> + Send + Sync,
{
    async fn list_categories(&self) -> Result<Vec<Category>, DbError> {
        queries::list_categories(self.database()).await
    }

    async fn get_or_create_category(&self, name: &str) -> Result<Category, DbError> {
        queries::get_or_create_category(self.database(), name).await
    }

    async fn reassign_category_sites(&self, from: i64, to: i64) -> Result<u64, DbError> {
        queries::reassign_category_sites(self.database(), from, to).await
    }

    async fn count_sites_in_category(&self, category_id: i64) -> Result<u64, DbError> {
        queries::count_sites_in_category(self.database(), category_id).await
    }

    async fn delete_category(&self, category_id: i64) -> Result<bool, DbError> {
        queries::delete_category(self.database(), category_id).await
    }
}

#[async_trait]
impl<D> AccessibilityStore for SqlStore<D>
where
    D: Deref<Target = dyn Database> + Send + Sync,
{
    async fn get_or_create_accessibility(
        &self,
        flags: AccessibilityFlags,
        note: Option<&str>,
    ) -> Result<Accessibility, DbError> {
        queries::get_or_create_accessibility(self.database(), flags, note).await
    }
}

#[async_trait]
impl<D> ItineraryStore for SqlStore<D>
where
    D: Deref<Target = dyn Database> + Send + Sync,
{
    async fn list_itineraries(&self, page: PageRequest) -> Result<ItineraryPage, DbError> {
        itineraries::list_itineraries(self.database(), page).await
    }

    async fn get_itinerary(&self, id: i64) -> Result<Option<Itinerary>, DbError> {
        itineraries::get_itinerary(self.database(), id).await
    }

    async fn itinerary_stops(&self, itinerary_id: i64) -> Result<Vec<StopRow>, DbError> {
        itineraries::itinerary_stops(self.database(), itinerary_id).await
    }

    async fn get_or_create_itinerary(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Itinerary, DbError> {
        itineraries::get_or_create_itinerary(self.database(), name, description).await
    }

    async fn clear_stops(&self, itinerary_id: i64) -> Result<u64, DbError> {
        itineraries::clear_stops(self.database(), itinerary_id).await
    }

    async fn add_stop(
        &self,
        itinerary_id: i64,
        site_id: i64,
        order: u32,
    ) -> Result<Stop, DbError> {
        itineraries::add_stop(self.database(), itinerary_id, site_id, order).await
    }

    async fn toggle_follow(&self, user: &str, itinerary_id: i64) -> Result<FollowStatus, DbError> {
        itineraries::toggle_follow(self.database(), user, itinerary_id).await
    }

    async fn followed_itineraries(
        &self,
        user: &str,
        itinerary_ids: &[i64],
    ) -> Result<BTreeSet<i64>, DbError> {
        itineraries::followed_itineraries(self.database(), user, itinerary_ids).await
    }

    async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, DbError> {
        itineraries::create_booking(self.database(), booking).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tempfile::TempDir;
    use unesco_map_database_models::ItineraryAccessibility;
    use unesco_map_heritage_models::{Coordinates, TriState};

    use super::*;
    use crate::db::open_db;
    use crate::memory::MemoryStore;

    async fn sqlite_store() -> (TempDir, SqlStore) {
        let dir = tempfile::tempdir().unwrap();
        let db = open_db(&dir.path().join("heritage.db")).await.unwrap();
        (dir, SqlStore::new(db))
    }

    fn site(unesco_id: &str, name: &str, city: &str, region: &str) -> SiteUpsert {
        SiteUpsert {
            unesco_id: unesco_id.to_string(),
            name: name.to_string(),
            description: String::new(),
            region: region.to_string(),
            city: city.to_string(),
            coordinates: Coordinates::new(41.9, 12.49).ok(),
            inscription_year: Some(1980),
            category_id: None,
            accessibility_id: None,
        }
    }

    fn flags(wheelchair: TriState, visual: TriState, hearing: TriState) -> AccessibilityFlags {
        AccessibilityFlags::new(wheelchair, visual, hearing)
    }

    /// Loads five sites covering every filter stage.
    async fn load_catalog(store: &dyn HeritageStore) {
        let culturale = store.get_or_create_category("Culturale").await.unwrap();
        let naturale = store.get_or_create_category("Naturale").await.unwrap();
        let partial = store
            .get_or_create_accessibility(flags(TriState::Yes, TriState::No, TriState::Unknown), None)
            .await
            .unwrap();
        let full = store
            .get_or_create_accessibility(flags(TriState::Yes, TriState::Yes, TriState::Yes), None)
            .await
            .unwrap();
        let unknown = store
            .get_or_create_accessibility(AccessibilityFlags::default(), Some("da verificare"))
            .await
            .unwrap();

        let entries = [
            ("1", "Centro Storico di Roma", "Roma", "Lazio", culturale.id, Some(partial.id)),
            ("2", "Sassi di Matera", "Matera", "Basilicata", culturale.id, Some(full.id)),
            ("3", "Dolomiti", "Belluno", "Veneto", naturale.id, None),
            ("4", "Villa Adriana", "Tivoli", "Lazio", culturale.id, Some(unknown.id)),
            ("5", "Monte Etna", "Catania", "Sicilia", naturale.id, Some(full.id)),
        ];
        for (unesco_id, name, city, region, category_id, accessibility_id) in entries {
            let mut upsert = site(unesco_id, name, city, region);
            upsert.category_id = Some(category_id);
            upsert.accessibility_id = accessibility_id;
            if unesco_id == "5" {
                upsert.coordinates = None;
            }
            store.upsert_site(&upsert).await.unwrap();
        }
    }

    fn query(pairs: &[(&str, &str)]) -> SiteQuery {
        let params: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SiteQuery::from_params(&params)
    }

    fn unesco_ids(page: &SitePage) -> Vec<&str> {
        page.rows.iter().map(|r| r.site.unesco_id.as_str()).collect()
    }

    #[tokio::test]
    async fn sql_and_memory_filters_agree() {
        let (_dir, sql) = sqlite_store().await;
        let memory = MemoryStore::new();
        load_catalog(&sql).await;
        load_catalog(&memory).await;

        let cases: &[(&[(&str, &str)], u64, &[&str])] = &[
            (&[], 5, &["1", "2", "3", "4", "5"]),
            (&[("accessibile", "1")], 5, &["1", "2", "3", "4", "5"]),
            (&[("q", "ma")], 2, &["1", "2"]),
            (&[("q", "100%")], 0, &[]),
            (&[("categoria", "cultural")], 3, &["1", "2", "4"]),
            (&[("categoria", "NATURALE")], 2, &["3", "5"]),
            (&[("regione", "lazio")], 2, &["1", "4"]),
            (&[("citta", "MATERA")], 1, &["2"]),
            (&[("wheelchair", "1")], 3, &["1", "2", "5"]),
            (&[("supporto_uditivo", "0")], 0, &[]),
            (&[("ausili_visivi", "no")], 1, &["1"]),
            (
                &[("wheelchair", "1"), ("ausili_visivi", "0"), ("acc_mode", "all")],
                1,
                &["1"],
            ),
            (
                &[("wheelchair", "1"), ("ausili_visivi", "0"), ("acc_mode", "any")],
                3,
                &["1", "2", "5"],
            ),
            (&[("has_acc_data", "1")], 3, &["1", "2", "5"]),
            (&[("regione", "Lazio"), ("has_acc_data", "1")], 1, &["1"]),
            (&[("limit", "2"), ("offset", "1")], 5, &["2", "3"]),
            (&[("q", "a"), ("limit", "1")], 4, &["1"]),
            (&[("offset", "99")], 5, &[]),
        ];

        for (params, total, expected) in cases {
            let site_query = query(params);
            let from_sql = sql.query_sites(&site_query).await.unwrap();
            let from_memory = memory.query_sites(&site_query).await.unwrap();

            assert_eq!(from_sql.total, *total, "sql total for {params:?}");
            assert_eq!(unesco_ids(&from_sql), *expected, "sql rows for {params:?}");
            assert_eq!(from_memory.total, *total, "memory total for {params:?}");
            assert_eq!(unesco_ids(&from_memory), *expected, "memory rows for {params:?}");
        }
    }

    #[tokio::test]
    async fn sql_rows_carry_category_and_accessibility() {
        let (_dir, sql) = sqlite_store().await;
        load_catalog(&sql).await;

        let roma = sql.site_by_unesco_id("1").await.unwrap().unwrap();
        assert_eq!(roma.category_name(), Some("Culturale"));
        assert_eq!(roma.accessibility_flags().wheelchair, TriState::Yes);
        assert_eq!(roma.accessibility_flags().visual_aids, TriState::No);
        assert_eq!(roma.accessibility_flags().hearing_support, TriState::Unknown);
        assert_eq!(roma.site.coordinates, Coordinates::new(41.9, 12.49).ok());

        let etna = sql.site_by_unesco_id("5").await.unwrap().unwrap();
        assert!(etna.site.coordinates.is_none());

        let dolomiti = sql.site_by_unesco_id("3").await.unwrap().unwrap();
        assert!(dolomiti.accessibility.is_none());
    }

    #[tokio::test]
    async fn sql_upsert_creates_then_overwrites() {
        let (_dir, sql) = sqlite_store().await;
        let other = sql
            .upsert_site(&site("92", "Arena", "Verona", "Veneto"))
            .await
            .unwrap();

        let first = sql
            .upsert_site(&site("91", "Centro Storico", "Roma", "Lazio"))
            .await
            .unwrap();
        assert!(first.created);

        let category = sql.get_or_create_category("Culturale").await.unwrap();
        let access = sql
            .get_or_create_accessibility(flags(TriState::Yes, TriState::Unknown, TriState::No), None)
            .await
            .unwrap();
        let mut changed = site("91", "Centro Storico di Roma", "Roma", "Lazio");
        changed.coordinates = Coordinates::new(41.89, 12.48).ok();
        changed.inscription_year = Some(1990);
        changed.category_id = Some(category.id);
        changed.accessibility_id = Some(access.id);

        let second = sql.upsert_site(&changed).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.id, first.id);

        let row = sql.site_by_unesco_id("91").await.unwrap().unwrap();
        assert_eq!(row.site.name, "Centro Storico di Roma");
        assert_eq!(row.site.coordinates, Coordinates::new(41.89, 12.48).ok());
        assert_eq!(row.site.inscription_year, Some(1990));
        assert_eq!(row.site.category_id, Some(category.id));
        assert_eq!(row.site.accessibility_id, Some(access.id));
        assert_eq!(row.accessibility_flags().wheelchair, TriState::Yes);

        let untouched = sql.site_by_unesco_id("92").await.unwrap().unwrap();
        assert_eq!(untouched.site.id, other.id);
        assert_eq!(untouched.site.name, "Arena");
        assert!(untouched.site.accessibility_id.is_none());
    }

    #[tokio::test]
    async fn sql_location_update_applies_given_fields() {
        let (_dir, sql) = sqlite_store().await;
        let mut arena = site("92", "Arena", "Verona", "Veneto");
        arena.coordinates = None;
        sql.upsert_site(&arena).await.unwrap();

        let update = SiteLocationUpdate {
            coordinates: Coordinates::new(45.4, 10.9).ok(),
            city: Some("VR".to_string()),
            region: None,
        };
        assert!(sql.update_site_location("92", &update).await.unwrap());

        let row = sql.site_by_unesco_id("92").await.unwrap().unwrap();
        assert_eq!(row.site.city, "VR");
        assert_eq!(row.site.region, "Veneto");
        assert_eq!(row.site.coordinates, Coordinates::new(45.4, 10.9).ok());

        let region_only = SiteLocationUpdate {
            region: Some("Veneto orientale".to_string()),
            ..SiteLocationUpdate::default()
        };
        assert!(sql.update_site_location("92", &region_only).await.unwrap());
        let row = sql.site_by_unesco_id("92").await.unwrap().unwrap();
        assert_eq!(row.site.region, "Veneto orientale");
        assert_eq!(row.site.city, "VR");

        assert!(!sql.update_site_location("999", &region_only).await.unwrap());
        assert!(
            !sql
                .update_site_location("92", &SiteLocationUpdate::default())
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn sql_accessibility_is_shared_by_flag_triple() {
        let (_dir, sql) = sqlite_store().await;
        let triple = flags(TriState::Yes, TriState::Unknown, TriState::No);

        let a = sql.get_or_create_accessibility(triple, None).await.unwrap();
        let b = sql
            .get_or_create_accessibility(triple, Some("rampa laterale"))
            .await
            .unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(b.note.as_deref(), Some("rampa laterale"));

        let c = sql.get_or_create_accessibility(triple, Some(" ")).await.unwrap();
        assert_eq!(c.id, a.id);
        assert_eq!(c.note.as_deref(), Some("rampa laterale"));

        let other = sql
            .get_or_create_accessibility(AccessibilityFlags::default(), None)
            .await
            .unwrap();
        assert_ne!(other.id, a.id);
    }

    #[tokio::test]
    async fn sql_category_delete_clears_site_reference() {
        let (_dir, sql) = sqlite_store().await;
        let misto = sql.get_or_create_category("misto").await.unwrap();
        let culturale = sql.get_or_create_category("Culturale").await.unwrap();
        for id in ["1", "2"] {
            let mut upsert = site(id, "Sito", "Roma", "Lazio");
            upsert.category_id = Some(misto.id);
            sql.upsert_site(&upsert).await.unwrap();
        }

        assert_eq!(sql.count_sites_in_category(misto.id).await.unwrap(), 2);
        assert_eq!(
            sql.reassign_category_sites(misto.id, culturale.id)
                .await
                .unwrap(),
            2
        );
        assert_eq!(sql.count_sites_in_category(misto.id).await.unwrap(), 0);

        let mut stray = site("3", "Sito", "Roma", "Lazio");
        stray.category_id = Some(misto.id);
        sql.upsert_site(&stray).await.unwrap();
        assert!(sql.delete_category(misto.id).await.unwrap());
        assert!(!sql.delete_category(misto.id).await.unwrap());

        let row = sql.site_by_unesco_id("3").await.unwrap().unwrap();
        assert_eq!(row.site.category_id, None);

        let names: Vec<String> = sql
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Culturale".to_string()]);
    }

    #[tokio::test]
    async fn sql_toggle_follow_twice_returns_to_unfollowed() {
        let (_dir, sql) = sqlite_store().await;
        let itinerary = sql.get_or_create_itinerary("Giro", "").await.unwrap();

        assert_eq!(
            sql.toggle_follow("mario", itinerary.id).await.unwrap(),
            FollowStatus::Added
        );
        assert!(
            sql.followed_itineraries("mario", &[itinerary.id])
                .await
                .unwrap()
                .contains(&itinerary.id)
        );
        assert!(
            sql.followed_itineraries("luigi", &[itinerary.id])
                .await
                .unwrap()
                .is_empty()
        );

        assert_eq!(
            sql.toggle_follow("mario", itinerary.id).await.unwrap(),
            FollowStatus::Removed
        );
        assert!(
            sql.followed_itineraries("mario", &[itinerary.id])
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn sql_itinerary_flags_and_stops_follow_sites() {
        let (_dir, sql) = sqlite_store().await;
        load_catalog(&sql).await;
        let site_id = |row: Option<SiteRow>| row.map(|r| r.site.id).unwrap();
        let roma = site_id(sql.site_by_unesco_id("1").await.unwrap());
        let matera = site_id(sql.site_by_unesco_id("2").await.unwrap());
        let dolomiti = site_id(sql.site_by_unesco_id("3").await.unwrap());

        let giro = sql.get_or_create_itinerary("Giro", "Nord e centro").await.unwrap();
        let completo = sql.get_or_create_itinerary("Completo", "").await.unwrap();
        let vuoto = sql.get_or_create_itinerary("Vuoto", "").await.unwrap();
        sql.add_stop(giro.id, dolomiti, 2).await.unwrap();
        sql.add_stop(giro.id, roma, 1).await.unwrap();
        sql.add_stop(completo.id, matera, 1).await.unwrap();

        let page = sql
            .list_itineraries(PageRequest::from_param(None))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let names: Vec<&str> = page
            .items
            .iter()
            .map(|s| s.itinerary.name.as_str())
            .collect();
        assert_eq!(names, vec!["Completo", "Giro", "Vuoto"]);

        let completo_flags = page.items[0].accessibility;
        assert!(completo_flags.wheelchair);
        assert!(completo_flags.visual_aids);
        assert!(completo_flags.hearing_support);

        let giro_flags = page.items[1].accessibility;
        assert!(giro_flags.wheelchair);
        assert!(!giro_flags.visual_aids);
        assert!(!giro_flags.hearing_support);

        assert_eq!(page.items[2].itinerary.id, vuoto.id);
        assert_eq!(page.items[2].accessibility, ItineraryAccessibility::default());

        let stops = sql.itinerary_stops(giro.id).await.unwrap();
        let ordered: Vec<(u32, &str)> = stops
            .iter()
            .map(|s| (s.order, s.site.site.unesco_id.as_str()))
            .collect();
        assert_eq!(ordered, vec![(1, "1"), (2, "3")]);

        let past_end = sql
            .list_itineraries(PageRequest::from_param(Some("5")))
            .await
            .unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 3);
    }

    #[tokio::test]
    async fn sql_stop_order_is_unique_per_itinerary() {
        let (_dir, sql) = sqlite_store().await;
        let site = sql
            .upsert_site(&site("1", "Centro Storico", "Roma", "Lazio"))
            .await
            .unwrap();
        let giro = sql.get_or_create_itinerary("Giro", "").await.unwrap();
        let altro = sql.get_or_create_itinerary("Altro", "").await.unwrap();

        sql.add_stop(giro.id, site.id, 1).await.unwrap();
        assert!(sql.add_stop(giro.id, site.id, 1).await.is_err());
        sql.add_stop(altro.id, site.id, 1).await.unwrap();

        assert_eq!(sql.clear_stops(giro.id).await.unwrap(), 1);
        assert!(sql.itinerary_stops(giro.id).await.unwrap().is_empty());
        assert_eq!(sql.itinerary_stops(altro.id).await.unwrap().len(), 1);
    }
}
