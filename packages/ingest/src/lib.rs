#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CSV import and maintenance commands for the heritage catalog.
//!
//! Every command is written against [`HeritageStore`] so it can be tested
//! with the in-memory store; [`run_atomic`] runs one against a database
//! transaction.

pub mod access;
pub mod categories;
pub mod coords;
pub mod interactive;
pub mod rows;
pub mod seed;
pub mod sites;

use std::fmt;

use switchy_database::Database;
use thiserror::Error;
use unesco_map_database::{DbError, HeritageStore, SqlStore};

use crate::access::{AccessImportSummary, MatchOn};
use crate::categories::NormalizeReport;
use crate::coords::CoordsUpdateSummary;
use crate::rows::CsvRows;
use crate::seed::SeedReport;
use crate::sites::SiteImportSummary;

/// Errors that abort an import command.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The CSV file could not be opened.
    #[error("Failed to open {path}: {source}")]
    Io {
        /// Path as given on the command line.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The CSV header could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Required interchange columns are absent from the header.
    #[error("CSV is missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] DbError),
    /// Opening, committing, or rolling back a transaction failed.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),
}

/// One maintenance command with its loaded input.
#[derive(Debug)]
pub enum Command {
    /// Create or update sites from the interchange CSV.
    ImportSites(CsvRows),
    /// Point sites at accessibility records from a flags CSV.
    ImportAccess(CsvRows, MatchOn),
    /// Patch coordinates and location text by `unesco_id`.
    UpdateCoords(CsvRows),
    /// Merge category spellings into the canonical pair.
    NormalizeCategories,
    /// Rebuild the demo itineraries.
    SeedItineraries,
}

impl Command {
    /// Short name used in log lines.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ImportSites(_) => "import-sites",
            Self::ImportAccess(..) => "import-access",
            Self::UpdateCoords(_) => "update-coords",
            Self::NormalizeCategories => "normalize-categories",
            Self::SeedItineraries => "seed-itineraries",
        }
    }

    /// Runs the command against `store`.
    ///
    /// # Errors
    ///
    /// Propagates the command's [`ImportError`].
    pub async fn run(&self, store: &dyn HeritageStore) -> Result<Report, ImportError> {
        Ok(match self {
            Self::ImportSites(rows) => Report::Sites(sites::import_sites(store, rows).await?),
            Self::ImportAccess(rows, match_on) => {
                Report::Access(access::import_access(store, rows, *match_on).await?)
            }
            Self::UpdateCoords(rows) => Report::Coords(coords::update_coords(store, rows).await?),
            Self::NormalizeCategories => {
                Report::Categories(categories::normalize_categories(store).await?)
            }
            Self::SeedItineraries => Report::Seed(seed::seed_itineraries(store).await?),
        })
    }
}

/// Outcome of a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// See [`sites::import_sites`].
    Sites(SiteImportSummary),
    /// See [`access::import_access`].
    Access(AccessImportSummary),
    /// See [`coords::update_coords`].
    Coords(CoordsUpdateSummary),
    /// See [`categories::normalize_categories`].
    Categories(NormalizeReport),
    /// See [`seed::seed_itineraries`].
    Seed(SeedReport),
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sites(s) => s.fmt(f),
            Self::Access(s) => s.fmt(f),
            Self::Coords(s) => s.fmt(f),
            Self::Categories(s) => s.fmt(f),
            Self::Seed(s) => s.fmt(f),
        }
    }
}

/// Runs `command` inside a single transaction on `db`.
///
/// The transaction is committed only if the command succeeds; any error
/// rolls back every write the command made.
///
/// # Errors
///
/// Returns the command's error, or [`ImportError::Database`] if the
/// transaction cannot be opened or committed.
pub async fn run_atomic(db: &dyn Database, command: &Command) -> Result<Report, ImportError> {
    log::info!("Running {}...", command.name());

    let txn = db.begin_transaction().await?;
    let result = {
        let conn: &(dyn Database + 'static) = txn.as_ref();
        let store = SqlStore::new(conn);
        command.run(&store).await
    };

    match result {
        Ok(report) => {
            txn.commit().await?;
            log::info!("{} committed", command.name());
            Ok(report)
        }
        Err(e) => {
            log::error!("{} failed, rolling back: {e}", command.name());
            if let Err(rollback) = txn.rollback().await {
                log::error!("Rollback failed: {rollback}");
            }
            Err(e)
        }
    }
}
