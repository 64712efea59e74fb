#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Persistence for the heritage catalog.
//!
//! Sites, categories, accessibility records, itineraries, follows and
//! bookings live in a single `SQLite` file managed through
//! `switchy_database`. Everything above this crate talks to the store
//! through the traits in [`store`], so the HTTP layer and the import
//! tooling can run against [`memory::MemoryStore`] in tests.

pub mod db;
pub mod filter;
pub mod itineraries;
pub mod memory;
pub mod paths;
pub mod queries;
pub mod store;

pub use store::{
    AccessibilityStore, CategoryStore, HeritageStore, ItineraryStore, SiteStore, SqlStore,
};

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Opening the database file failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// An I/O operation failed (e.g., creating the data directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// A referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of row that was looked up.
        entity: &'static str,
        /// The missing key.
        id: String,
    },

    /// A uniqueness or range constraint was violated.
    #[error("Constraint violation: {0}")]
    Constraint(String),
}
