//! Database connection and schema.
//!
//! Opens (or creates) the heritage `SQLite` database and ensures every table
//! exists. The schema is idempotent, so opening an existing file is safe.

use std::path::Path;

use switchy_database::Database;
use switchy_database_connection::init_sqlite_rusqlite;

use crate::DbError;

/// Opens the database at the path given by `HERITAGE_DB_PATH`, falling back
/// to `data/heritage.db`.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be created or the schema DDL fails.
pub async fn connect_from_env() -> Result<Box<dyn Database>, DbError> {
    let path = crate::paths::db_path();
    log::info!("Opening heritage database at {}", path.display());
    open_db(&path).await
}

/// Opens (or creates) the heritage database at `path` and ensures all tables
/// exist.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be created or the schema DDL fails.
pub async fn open_db(path: &Path) -> Result<Box<dyn Database>, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    let db = init_sqlite_rusqlite(Some(path)).map_err(|e| DbError::Connection(e.to_string()))?;

    ensure_schema(db.as_ref()).await?;

    Ok(db)
}

/// Creates all tables and indexes if they don't already exist.
///
/// # Errors
///
/// Returns [`DbError`] if any DDL statement fails.
pub async fn ensure_schema(db: &dyn Database) -> Result<(), DbError> {
    // Only reaches one pooled connection; queries do not rely on cascades
    db.exec_raw("PRAGMA foreign_keys = ON").await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS categories (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT ''
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS accessibility (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            wheelchair      INTEGER CHECK (wheelchair IN (0, 1)),
            visual_aids     INTEGER CHECK (visual_aids IN (0, 1)),
            hearing_support INTEGER CHECK (hearing_support IN (0, 1)),
            note            TEXT
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS sites (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            unesco_id        TEXT NOT NULL UNIQUE,
            name             TEXT NOT NULL,
            description      TEXT NOT NULL DEFAULT '',
            region           TEXT NOT NULL DEFAULT '',
            city             TEXT NOT NULL DEFAULT '',
            latitude         REAL CHECK (latitude BETWEEN -90 AND 90),
            longitude        REAL CHECK (longitude BETWEEN -180 AND 180),
            inscription_year INTEGER,
            category_id      INTEGER REFERENCES categories(id) ON DELETE SET NULL,
            accessibility_id INTEGER REFERENCES accessibility(id) ON DELETE SET NULL,
            CHECK ((latitude IS NULL) = (longitude IS NULL))
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS itineraries (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT ''
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS stops (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            itinerary_id INTEGER NOT NULL REFERENCES itineraries(id) ON DELETE CASCADE,
            site_id      INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
            position     INTEGER NOT NULL,
            UNIQUE(itinerary_id, position)
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS itinerary_follows (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id      TEXT NOT NULL,
            itinerary_id INTEGER NOT NULL REFERENCES itineraries(id) ON DELETE CASCADE,
            created_at   TEXT NOT NULL,
            UNIQUE(user_id, itinerary_id)
        )",
    )
    .await?;

    db.exec_raw(
        "CREATE TABLE IF NOT EXISTS bookings (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            itinerary_id INTEGER NOT NULL REFERENCES itineraries(id) ON DELETE CASCADE,
            name         TEXT NOT NULL,
            email        TEXT NOT NULL,
            visit_date   TEXT NOT NULL,
            party_size   INTEGER NOT NULL CHECK (party_size >= 1),
            note         TEXT NOT NULL DEFAULT '',
            created_at   TEXT NOT NULL
        )",
    )
    .await?;

    db.exec_raw("CREATE INDEX IF NOT EXISTS idx_sites_category ON sites (category_id)")
        .await?;
    db.exec_raw("CREATE INDEX IF NOT EXISTS idx_sites_accessibility ON sites (accessibility_id)")
        .await?;
    db.exec_raw("CREATE INDEX IF NOT EXISTS idx_stops_site ON stops (site_id)")
        .await?;

    Ok(())
}
