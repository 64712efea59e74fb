//! Itinerary, stop, follow, and booking queries.

use std::collections::BTreeSet;

use chrono::Utc;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};
use unesco_map_database_models::{
    ItineraryAccessibility, ItineraryPage, ItinerarySummary, PageRequest, StopRow,
};
use unesco_map_heritage_models::{Booking, FollowStatus, Itinerary, NewBooking, Stop};

use crate::DbError;
use crate::queries::{SITE_COLUMNS, returning_id, row_count, row_to_site_row};

/// Existence checks over an itinerary's stops, one per accessibility flag.
const ACCESSIBILITY_EXISTS: &str = "SELECT
    EXISTS (SELECT 1 FROM stops t
            JOIN sites s ON s.id = t.site_id
            JOIN accessibility a ON a.id = s.accessibility_id
            WHERE t.itinerary_id = $1 AND a.wheelchair = 1) AS has_wheelchair,
    EXISTS (SELECT 1 FROM stops t
            JOIN sites s ON s.id = t.site_id
            JOIN accessibility a ON a.id = s.accessibility_id
            WHERE t.itinerary_id = $2 AND a.visual_aids = 1) AS has_visual_aids,
    EXISTS (SELECT 1 FROM stops t
            JOIN sites s ON s.id = t.site_id
            JOIN accessibility a ON a.id = s.accessibility_id
            WHERE t.itinerary_id = $3 AND a.hearing_support = 1) AS has_hearing_support";

fn row_to_itinerary(row: &Row) -> Itinerary {
    Itinerary {
        id: row.to_value("id").unwrap_or(0),
        name: row.to_value("name").unwrap_or_default(),
        description: row.to_value("description").unwrap_or_default(),
    }
}

fn row_flag(row: &Row, col: &str) -> bool {
    row.to_value::<i64>(col).unwrap_or(0) != 0
}

/// Computes the derived accessibility flags of one itinerary.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn itinerary_accessibility(
    db: &dyn Database,
    itinerary_id: i64,
) -> Result<ItineraryAccessibility, DbError> {
    let rows = db
        .query_raw_params(
            ACCESSIBILITY_EXISTS,
            &[
                DatabaseValue::Int64(itinerary_id),
                DatabaseValue::Int64(itinerary_id),
                DatabaseValue::Int64(itinerary_id),
            ],
        )
        .await?;

    Ok(rows.first().map_or_else(ItineraryAccessibility::default, |row| {
        ItineraryAccessibility {
            wheelchair: row_flag(row, "has_wheelchair"),
            visual_aids: row_flag(row, "has_visual_aids"),
            hearing_support: row_flag(row, "has_hearing_support"),
        }
    }))
}

/// Lists one page of itineraries ordered by name, with derived
/// accessibility flags.
///
/// A page past the end yields no items; `total` is always filled in.
///
/// # Errors
///
/// Returns [`DbError`] if any query fails.
pub async fn list_itineraries(
    db: &dyn Database,
    page: PageRequest,
) -> Result<ItineraryPage, DbError> {
    let count_rows = db
        .query_raw_params("SELECT COUNT(*) AS total FROM itineraries", &[])
        .await?;
    let total = row_count(&count_rows, "total");

    let rows = db
        .query_raw_params(
            "SELECT id, name, description FROM itineraries
             ORDER BY name, id
             LIMIT $1 OFFSET $2",
            &[
                DatabaseValue::Int64(i64::from(page.per_page)),
                DatabaseValue::Int64(i64::try_from(page.offset()).unwrap_or(i64::MAX)),
            ],
        )
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in &rows {
        let itinerary = row_to_itinerary(row);
        let accessibility = itinerary_accessibility(db, itinerary.id).await?;
        items.push(ItinerarySummary {
            itinerary,
            accessibility,
        });
    }

    Ok(ItineraryPage { items, total })
}

/// Fetches an itinerary by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn get_itinerary(db: &dyn Database, id: i64) -> Result<Option<Itinerary>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, name, description FROM itineraries WHERE id = $1",
            &[DatabaseValue::Int64(id)],
        )
        .await?;
    Ok(rows.first().map(row_to_itinerary))
}

/// Returns an itinerary's stops joined with their sites, in stop order.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn itinerary_stops(db: &dyn Database, itinerary_id: i64) -> Result<Vec<StopRow>, DbError> {
    let sql = format!(
        "SELECT {SITE_COLUMNS}, t.position
         FROM stops t
         JOIN sites s ON s.id = t.site_id
         LEFT JOIN categories c ON c.id = s.category_id
         LEFT JOIN accessibility a ON a.id = s.accessibility_id
         WHERE t.itinerary_id = $1
         ORDER BY t.position"
    );
    let rows = db
        .query_raw_params(&sql, &[DatabaseValue::Int64(itinerary_id)])
        .await?;

    Ok(rows
        .iter()
        .map(|row| StopRow {
            order: row
                .to_value::<i64>("position")
                .ok()
                .and_then(|p| u32::try_from(p).ok())
                .unwrap_or(0),
            site: row_to_site_row(row),
        })
        .collect())
}

/// Returns the lowest-id itinerary named `name`, creating it with
/// `description` if none exists.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub async fn get_or_create_itinerary(
    db: &dyn Database,
    name: &str,
    description: &str,
) -> Result<Itinerary, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, name, description FROM itineraries WHERE name = $1 ORDER BY id LIMIT 1",
            &[DatabaseValue::String(name.to_string())],
        )
        .await?;
    if let Some(row) = rows.first() {
        return Ok(row_to_itinerary(row));
    }

    let rows = db
        .query_raw_params(
            "INSERT INTO itineraries (name, description) VALUES ($1, $2) RETURNING id",
            &[
                DatabaseValue::String(name.to_string()),
                DatabaseValue::String(description.to_string()),
            ],
        )
        .await?;

    Ok(Itinerary {
        id: returning_id(&rows, "itinerary")?,
        name: name.to_string(),
        description: description.to_string(),
    })
}

/// Deletes every stop of an itinerary. Returns the number removed.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails.
pub async fn clear_stops(db: &dyn Database, itinerary_id: i64) -> Result<u64, DbError> {
    Ok(db
        .exec_raw_params(
            "DELETE FROM stops WHERE itinerary_id = $1",
            &[DatabaseValue::Int64(itinerary_id)],
        )
        .await?)
}

/// Appends a stop. `(itinerary_id, order)` must be unused.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails, including on a duplicate order.
pub async fn add_stop(
    db: &dyn Database,
    itinerary_id: i64,
    site_id: i64,
    order: u32,
) -> Result<Stop, DbError> {
    let rows = db
        .query_raw_params(
            "INSERT INTO stops (itinerary_id, site_id, position) VALUES ($1, $2, $3) RETURNING id",
            &[
                DatabaseValue::Int64(itinerary_id),
                DatabaseValue::Int64(site_id),
                DatabaseValue::Int64(i64::from(order)),
            ],
        )
        .await?;

    Ok(Stop {
        id: returning_id(&rows, "stop")?,
        itinerary_id,
        site_id,
        order,
    })
}

/// Follows the itinerary if `user` does not follow it yet, otherwise
/// unfollows it.
///
/// The insert is conflict-tolerant, so two concurrent toggles never fail
/// on the `(user_id, itinerary_id)` constraint.
///
/// # Errors
///
/// Returns [`DbError`] if either statement fails.
pub async fn toggle_follow(
    db: &dyn Database,
    user: &str,
    itinerary_id: i64,
) -> Result<FollowStatus, DbError> {
    let inserted = db
        .exec_raw_params(
            "INSERT INTO itinerary_follows (user_id, itinerary_id, created_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, itinerary_id) DO NOTHING",
            &[
                DatabaseValue::String(user.to_string()),
                DatabaseValue::Int64(itinerary_id),
                DatabaseValue::String(Utc::now().to_rfc3339()),
            ],
        )
        .await?;

    if inserted > 0 {
        return Ok(FollowStatus::Added);
    }

    db.exec_raw_params(
        "DELETE FROM itinerary_follows WHERE user_id = $1 AND itinerary_id = $2",
        &[
            DatabaseValue::String(user.to_string()),
            DatabaseValue::Int64(itinerary_id),
        ],
    )
    .await?;

    Ok(FollowStatus::Removed)
}

/// Returns the subset of `itinerary_ids` that `user` follows.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn followed_itineraries(
    db: &dyn Database,
    user: &str,
    itinerary_ids: &[i64],
) -> Result<BTreeSet<i64>, DbError> {
    if itinerary_ids.is_empty() {
        return Ok(BTreeSet::new());
    }

    let placeholders: Vec<String> = (0..itinerary_ids.len())
        .map(|i| format!("${}", i + 2))
        .collect();
    let sql = format!(
        "SELECT itinerary_id FROM itinerary_follows
         WHERE user_id = $1 AND itinerary_id IN ({})",
        placeholders.join(", ")
    );

    let mut params = Vec::with_capacity(itinerary_ids.len() + 1);
    params.push(DatabaseValue::String(user.to_string()));
    params.extend(itinerary_ids.iter().copied().map(DatabaseValue::Int64));

    let rows = db.query_raw_params(&sql, &params).await?;
    Ok(rows
        .iter()
        .filter_map(|r| r.to_value::<i64>("itinerary_id").ok())
        .collect())
}

/// Stores a validated booking.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub async fn create_booking(db: &dyn Database, booking: &NewBooking) -> Result<Booking, DbError> {
    let created_at = Utc::now();
    let rows = db
        .query_raw_params(
            "INSERT INTO bookings (itinerary_id, name, email, visit_date, party_size, note, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
            &[
                DatabaseValue::Int64(booking.itinerary_id),
                DatabaseValue::String(booking.name.trim().to_string()),
                DatabaseValue::String(booking.email.trim().to_string()),
                DatabaseValue::String(booking.date.format("%Y-%m-%d").to_string()),
                DatabaseValue::Int64(i64::from(booking.party_size)),
                DatabaseValue::String(booking.note.clone()),
                DatabaseValue::String(created_at.to_rfc3339()),
            ],
        )
        .await?;

    Ok(Booking {
        id: returning_id(&rows, "booking")?,
        itinerary_id: booking.itinerary_id,
        name: booking.name.trim().to_string(),
        email: booking.email.trim().to_string(),
        date: booking.date,
        party_size: booking.party_size,
        note: booking.note.clone(),
        created_at,
    })
}
