//! Persistent, identifier-indexed quake storage.
//!
//! [`QuakeStore`] is the narrow contract the sync layer writes through:
//! query-before-insert dedup, one batched commit per merge pass, and
//! post-hoc attachment of nearby-cities and country-code data. Two
//! implementations ship: [`SqliteStore`] for real use and [`MemStore`] for
//! deterministic tests.

pub mod memory;
pub mod sqlite;

pub use memory::MemStore;
pub use sqlite::SqliteStore;

use thiserror::Error;

use quakefeed_core::{ParsedNearbyCity, QuakeRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error for {identifier}: {source}")]
    Serialize {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no stored quake with identifier {identifier}")]
    MissingQuake { identifier: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        StoreError::Database(error.to_string())
    }
}

/// The store contract consumed by the sync coordinator.
///
/// Implementations must keep at most one record per identifier. They do not
/// need to serialize concurrent writers themselves — the coordinator runs
/// every merge pass under a single-writer lock.
pub trait QuakeStore: Send + Sync {
    /// Looks up a persisted record by its provider-assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on storage failure.
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<QuakeRecord>, StoreError>;

    /// Inserts a batch in one commit and returns how many records were
    /// actually added. A record whose identifier already exists is left
    /// untouched and not counted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] on storage or serialization failure; a failed
    /// batch inserts nothing.
    fn insert_all(&self, records: &[QuakeRecord]) -> Result<usize, StoreError>;

    /// Removes every persisted record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on storage failure.
    fn delete_all(&self) -> Result<(), StoreError>;

    /// Attaches a nearby-cities list to an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingQuake`] when no record has `identifier`.
    fn update_nearby_cities(
        &self,
        identifier: &str,
        cities: &[ParsedNearbyCity],
    ) -> Result<(), StoreError>;

    /// Sets the country code on an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingQuake`] when no record has `identifier`.
    fn update_country_code(&self, identifier: &str, code: &str) -> Result<(), StoreError>;

    /// Number of persisted records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on storage failure.
    fn count(&self) -> Result<usize, StoreError>;

    /// Every persisted identifier, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] on storage failure.
    fn all_identifiers(&self) -> Result<Vec<String>, StoreError>;
}
