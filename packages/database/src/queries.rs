//! Site, category, and accessibility queries.
//!
//! All statements are raw `SQLite` with `$n` placeholders. Filtered site
//! reads render their `WHERE` clause through [`crate::filter`].

use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue, Row};
use unesco_map_database_models::{
    SitePage, SiteQuery, SiteRow, SiteLocationUpdate, SiteUpsert, UpsertOutcome,
};
use unesco_map_heritage_models::{
    Accessibility, AccessibilityFlags, Category, Coordinates, Site, TriState,
};

use crate::{DbError, filter};

/// Columns selected for every [`SiteRow`] read.
pub(crate) const SITE_COLUMNS: &str = "s.id AS site_id, s.unesco_id, s.name AS site_name,
        s.description AS site_description, s.region, s.city, s.latitude, s.longitude,
        s.inscription_year, s.category_id, s.accessibility_id,
        c.id AS cat_id, c.name AS cat_name, c.description AS cat_description,
        a.id AS acc_id, a.wheelchair, a.visual_aids, a.hearing_support, a.note AS acc_note";

/// Site table with its category and accessibility joins.
pub(crate) const SITE_JOINS: &str = "sites s
        LEFT JOIN categories c ON c.id = s.category_id
        LEFT JOIN accessibility a ON a.id = s.accessibility_id";

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

/// Converts a [`TriState`] into a nullable `INTEGER` value.
pub(crate) fn tri_state_value(value: TriState) -> DatabaseValue {
    value
        .as_option()
        .map_or(DatabaseValue::Null, |b| DatabaseValue::Int64(i64::from(b)))
}

/// Reads an `INTEGER` column as a [`TriState`] (1 = yes, 0 = no).
fn row_tri_state(row: &Row, col: &str) -> TriState {
    row.to_value::<Option<i64>>(col)
        .unwrap_or(None)
        .map(|v| v != 0)
        .into()
}

fn opt_string(value: Option<&str>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |s| DatabaseValue::String(s.to_string()))
}

/// Extracts the `id` column of the first row returned by a `RETURNING id`
/// clause.
pub(crate) fn returning_id(rows: &[Row], entity: &str) -> Result<i64, DbError> {
    rows.first()
        .and_then(|r| r.to_value::<i64>("id").ok())
        .ok_or_else(|| DbError::Conversion {
            message: format!("Failed to get {entity} id from insert"),
        })
}

/// Reads a non-negative count column.
pub(crate) fn row_count(rows: &[Row], col: &str) -> u64 {
    rows.first()
        .and_then(|r| r.to_value::<i64>(col).ok())
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(0)
}

/// Builds a [`SiteRow`] from a row selected with [`SITE_COLUMNS`].
pub(crate) fn row_to_site_row(row: &Row) -> SiteRow {
    let latitude: Option<f64> = row.to_value("latitude").unwrap_or(None);
    let longitude: Option<f64> = row.to_value("longitude").unwrap_or(None);

    let site = Site {
        id: row.to_value("site_id").unwrap_or(0),
        unesco_id: row.to_value("unesco_id").unwrap_or_default(),
        name: row.to_value("site_name").unwrap_or_default(),
        description: row.to_value("site_description").unwrap_or_default(),
        region: row.to_value("region").unwrap_or_default(),
        city: row.to_value("city").unwrap_or_default(),
        coordinates: Coordinates::from_pair(latitude, longitude),
        inscription_year: row
            .to_value::<Option<i64>>("inscription_year")
            .unwrap_or(None)
            .and_then(|y| i32::try_from(y).ok()),
        category_id: row.to_value("category_id").unwrap_or(None),
        accessibility_id: row.to_value("accessibility_id").unwrap_or(None),
    };

    let category = row
        .to_value::<Option<i64>>("cat_id")
        .unwrap_or(None)
        .map(|id| Category {
            id,
            name: row.to_value("cat_name").unwrap_or_default(),
            description: row.to_value("cat_description").unwrap_or_default(),
        });

    let accessibility = row
        .to_value::<Option<i64>>("acc_id")
        .unwrap_or(None)
        .map(|id| Accessibility {
            id,
            flags: AccessibilityFlags::new(
                row_tri_state(row, "wheelchair"),
                row_tri_state(row, "visual_aids"),
                row_tri_state(row, "hearing_support"),
            ),
            note: row.to_value("acc_note").unwrap_or(None),
        });

    SiteRow {
        site,
        category,
        accessibility,
    }
}

fn row_to_category(row: &Row) -> Category {
    Category {
        id: row.to_value("id").unwrap_or(0),
        name: row.to_value("name").unwrap_or_default(),
        description: row.to_value("description").unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

/// Runs a filtered, paginated site query.
///
/// The total is counted with the same `WHERE` clause before the
/// `LIMIT`/`OFFSET` window is applied. Rows are ordered by site id.
///
/// # Errors
///
/// Returns [`DbError`] if either query fails.
pub async fn query_sites(db: &dyn Database, query: &SiteQuery) -> Result<SitePage, DbError> {
    let count_filter = filter::render(query);
    let count_sql = format!(
        "SELECT COUNT(*) AS total FROM {SITE_JOINS} {}",
        count_filter.where_clause
    );
    let count_rows = db.query_raw_params(&count_sql, &count_filter.params).await?;
    let total = row_count(&count_rows, "total");

    let mut page_filter = filter::render(query);
    let idx = page_filter.next_param();
    let sql = format!(
        "SELECT {SITE_COLUMNS} FROM {SITE_JOINS} {} ORDER BY s.id LIMIT ${} OFFSET ${}",
        page_filter.where_clause,
        idx,
        idx + 1,
    );
    let pagination = query.pagination();
    page_filter
        .params
        .push(DatabaseValue::Int64(i64::from(pagination.limit())));
    page_filter.params.push(DatabaseValue::Int64(
        i64::try_from(pagination.offset()).unwrap_or(i64::MAX),
    ));

    let rows = db.query_raw_params(&sql, &page_filter.params).await?;

    Ok(SitePage {
        rows: rows.iter().map(row_to_site_row).collect(),
        total,
    })
}

async fn site_where(
    db: &dyn Database,
    condition: &str,
    value: DatabaseValue,
) -> Result<Option<SiteRow>, DbError> {
    let sql = format!("SELECT {SITE_COLUMNS} FROM {SITE_JOINS} WHERE {condition} ORDER BY s.id LIMIT 1");
    let rows = db.query_raw_params(&sql, &[value]).await?;
    Ok(rows.first().map(row_to_site_row))
}

/// Looks up a site by its UNESCO identifier.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn site_by_unesco_id(
    db: &dyn Database,
    unesco_id: &str,
) -> Result<Option<SiteRow>, DbError> {
    site_where(db, "s.unesco_id = $1", DatabaseValue::String(unesco_id.to_string())).await
}

/// Looks up a site by its exact name. Duplicate names resolve to the
/// lowest id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn site_by_name(db: &dyn Database, name: &str) -> Result<Option<SiteRow>, DbError> {
    site_where(db, "s.name = $1", DatabaseValue::String(name.to_string())).await
}

/// Returns the lowest-id site whose name contains `keyword`, ignoring case.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn first_site_name_containing(
    db: &dyn Database,
    keyword: &str,
) -> Result<Option<SiteRow>, DbError> {
    let pattern = format!("%{}%", filter::escape_like(&keyword.to_lowercase()));
    site_where(
        db,
        "LOWER(s.name) LIKE $1 ESCAPE '\\'",
        DatabaseValue::String(pattern),
    )
    .await
}

/// Every column but `unesco_id`, in `sites` column order.
fn attribute_values(site: &SiteUpsert) -> Vec<DatabaseValue> {
    vec![
        DatabaseValue::String(site.name.clone()),
        DatabaseValue::String(site.description.clone()),
        DatabaseValue::String(site.region.clone()),
        DatabaseValue::String(site.city.clone()),
        site.coordinates
            .map_or(DatabaseValue::Null, |c| DatabaseValue::Real64(c.latitude())),
        site.coordinates
            .map_or(DatabaseValue::Null, |c| DatabaseValue::Real64(c.longitude())),
        site.inscription_year
            .map_or(DatabaseValue::Null, |y| DatabaseValue::Int64(i64::from(y))),
        site.category_id.map_or(DatabaseValue::Null, DatabaseValue::Int64),
        site.accessibility_id
            .map_or(DatabaseValue::Null, DatabaseValue::Int64),
    ]
}

/// Creates or fully overwrites a site, matching on `unesco_id`.
///
/// `SQLite` numbers `$n` parameters by first appearance in the statement, so
/// placeholders are always written in the order their values are bound.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub async fn upsert_site(db: &dyn Database, site: &SiteUpsert) -> Result<UpsertOutcome, DbError> {
    let existing = db
        .query_raw_params(
            "SELECT id FROM sites WHERE unesco_id = $1",
            &[DatabaseValue::String(site.unesco_id.clone())],
        )
        .await?;

    if let Some(id) = existing.first().and_then(|r| r.to_value::<i64>("id").ok()) {
        let mut params = attribute_values(site);
        params.push(DatabaseValue::Int64(id));
        db.exec_raw_params(
            "UPDATE sites SET
                name = $1, description = $2, region = $3, city = $4,
                latitude = $5, longitude = $6, inscription_year = $7,
                category_id = $8, accessibility_id = $9
             WHERE id = $10",
            &params,
        )
        .await?;
        return Ok(UpsertOutcome { id, created: false });
    }

    let mut params = vec![DatabaseValue::String(site.unesco_id.clone())];
    params.extend(attribute_values(site));
    let rows = db
        .query_raw_params(
            "INSERT INTO sites (
                unesco_id, name, description, region, city,
                latitude, longitude, inscription_year, category_id, accessibility_id
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING id",
            &params,
        )
        .await?;

    Ok(UpsertOutcome {
        id: returning_id(&rows, "site")?,
        created: true,
    })
}

/// Applies a partial location update to the site with `unesco_id`.
///
/// Returns `true` if a site was changed.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails.
pub async fn update_site_location(
    db: &dyn Database,
    unesco_id: &str,
    update: &SiteLocationUpdate,
) -> Result<bool, DbError> {
    if update.is_empty() {
        return Ok(false);
    }

    let mut assignments: Vec<String> = Vec::new();
    let mut params: Vec<DatabaseValue> = Vec::new();

    if let Some(coordinates) = update.coordinates {
        assignments.push(format!("latitude = ${}", params.len() + 1));
        params.push(DatabaseValue::Real64(coordinates.latitude()));
        assignments.push(format!("longitude = ${}", params.len() + 1));
        params.push(DatabaseValue::Real64(coordinates.longitude()));
    }
    if let Some(city) = &update.city {
        assignments.push(format!("city = ${}", params.len() + 1));
        params.push(DatabaseValue::String(city.clone()));
    }
    if let Some(region) = &update.region {
        assignments.push(format!("region = ${}", params.len() + 1));
        params.push(DatabaseValue::String(region.clone()));
    }

    let sql = format!(
        "UPDATE sites SET {} WHERE unesco_id = ${}",
        assignments.join(", "),
        params.len() + 1
    );
    params.push(DatabaseValue::String(unesco_id.to_string()));
    let affected = db.exec_raw_params(&sql, &params).await?;
    Ok(affected > 0)
}

/// Points a site at an accessibility record, or clears the reference.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails.
pub async fn set_site_accessibility(
    db: &dyn Database,
    site_id: i64,
    accessibility_id: Option<i64>,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE sites SET accessibility_id = $1 WHERE id = $2",
        &[
            accessibility_id.map_or(DatabaseValue::Null, DatabaseValue::Int64),
            DatabaseValue::Int64(site_id),
        ],
    )
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Lists all categories ordered by name.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn list_categories(db: &dyn Database) -> Result<Vec<Category>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id, name, description FROM categories ORDER BY name, id",
            &[],
        )
        .await?;
    Ok(rows.iter().map(row_to_category).collect())
}

/// Returns the category named exactly `name`, creating it if needed.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub async fn get_or_create_category(db: &dyn Database, name: &str) -> Result<Category, DbError> {
    db.exec_raw_params(
        "INSERT INTO categories (name, description) VALUES ($1, '')
         ON CONFLICT (name) DO NOTHING",
        &[DatabaseValue::String(name.to_string())],
    )
    .await?;

    let rows = db
        .query_raw_params(
            "SELECT id, name, description FROM categories WHERE name = $1",
            &[DatabaseValue::String(name.to_string())],
        )
        .await?;

    rows.first().map(row_to_category).ok_or_else(|| DbError::NotFound {
        entity: "category",
        id: name.to_string(),
    })
}

/// Moves every site of category `from` to category `to`.
///
/// Returns the number of reassigned sites.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails.
pub async fn reassign_category_sites(db: &dyn Database, from: i64, to: i64) -> Result<u64, DbError> {
    Ok(db
        .exec_raw_params(
            "UPDATE sites SET category_id = $1 WHERE category_id = $2",
            &[DatabaseValue::Int64(to), DatabaseValue::Int64(from)],
        )
        .await?)
}

/// Counts the sites referencing a category.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn count_sites_in_category(db: &dyn Database, category_id: i64) -> Result<u64, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT COUNT(*) AS total FROM sites WHERE category_id = $1",
            &[DatabaseValue::Int64(category_id)],
        )
        .await?;
    Ok(row_count(&rows, "total"))
}

/// Deletes a category. Sites still referencing it lose the reference.
///
/// Returns `true` if a row was deleted.
///
/// # Errors
///
/// Returns [`DbError`] if the statement fails.
pub async fn delete_category(db: &dyn Database, category_id: i64) -> Result<bool, DbError> {
    // `ON DELETE SET NULL` only fires on connections with foreign keys enabled
    db.exec_raw_params(
        "UPDATE sites SET category_id = NULL WHERE category_id = $1",
        &[DatabaseValue::Int64(category_id)],
    )
    .await?;

    let affected = db
        .exec_raw_params(
            "DELETE FROM categories WHERE id = $1",
            &[DatabaseValue::Int64(category_id)],
        )
        .await?;
    Ok(affected > 0)
}

// ---------------------------------------------------------------------------
// Accessibility
// ---------------------------------------------------------------------------

/// Returns the lowest-id accessibility record with exactly these flags,
/// creating it if none exists.
///
/// A non-blank `note` that differs from the stored one overwrites it.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub async fn get_or_create_accessibility(
    db: &dyn Database,
    flags: AccessibilityFlags,
    note: Option<&str>,
) -> Result<Accessibility, DbError> {
    let note = note.map(str::trim).filter(|n| !n.is_empty());

    // `IS` compares NULLs as equal, so unknown flags match unknown flags
    let rows = db
        .query_raw_params(
            "SELECT id, note FROM accessibility
             WHERE wheelchair IS $1 AND visual_aids IS $2 AND hearing_support IS $3
             ORDER BY id LIMIT 1",
            &[
                tri_state_value(flags.wheelchair),
                tri_state_value(flags.visual_aids),
                tri_state_value(flags.hearing_support),
            ],
        )
        .await?;

    if let Some(row) = rows.first() {
        let id: i64 = row.to_value("id").unwrap_or(0);
        let stored: Option<String> = row.to_value("note").unwrap_or(None);

        if let Some(note) = note
            && stored.as_deref() != Some(note)
        {
            db.exec_raw_params(
                "UPDATE accessibility SET note = $1 WHERE id = $2",
                &[DatabaseValue::String(note.to_string()), DatabaseValue::Int64(id)],
            )
            .await?;
            return Ok(Accessibility {
                id,
                flags,
                note: Some(note.to_string()),
            });
        }

        return Ok(Accessibility {
            id,
            flags,
            note: stored,
        });
    }

    let rows = db
        .query_raw_params(
            "INSERT INTO accessibility (wheelchair, visual_aids, hearing_support, note)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
            &[
                tri_state_value(flags.wheelchair),
                tri_state_value(flags.visual_aids),
                tri_state_value(flags.hearing_support),
                opt_string(note),
            ],
        )
        .await?;

    Ok(Accessibility {
        id: returning_id(&rows, "accessibility")?,
        flags,
        note: note.map(str::to_string),
    })
}
