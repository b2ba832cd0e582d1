//! SQLite-backed quake store.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use quakefeed_core::{distant_future, ParsedNearbyCity, Provider, QuakeRecord};

use crate::{QuakeStore, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS quakes (
    identifier          TEXT PRIMARY KEY,
    occurred_at_ms      INTEGER NOT NULL,
    latitude            REAL NOT NULL,
    longitude           REAL NOT NULL,
    magnitude           REAL NOT NULL,
    depth_meters        REAL NOT NULL,
    name                TEXT NOT NULL,
    weblink             TEXT NOT NULL,
    detail_url          TEXT NOT NULL,
    provider            TEXT NOT NULL,
    felt                REAL NOT NULL,
    country_code        TEXT,
    nearby_cities_json  TEXT
);

CREATE INDEX IF NOT EXISTS idx_quakes_occurred_at ON quakes(occurred_at_ms);
";

/// Identifier-indexed quake records in a SQLite file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a store backed by a file on disk.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the file cannot be opened or
    /// the schema cannot be created.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] when the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl QuakeStore for SqliteStore {
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<QuakeRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT identifier, occurred_at_ms, latitude, longitude, magnitude,
                        depth_meters, name, weblink, detail_url, provider, felt,
                        country_code, nearby_cities_json
                   FROM quakes WHERE identifier = ?1",
                [identifier],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn insert_all(&self, records: &[QuakeRecord]) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO quakes
                    (identifier, occurred_at_ms, latitude, longitude, magnitude,
                     depth_meters, name, weblink, detail_url, provider, felt,
                     country_code, nearby_cities_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for record in records {
                let cities_json = match &record.nearby_cities {
                    Some(cities) => Some(serde_json::to_string(cities).map_err(|source| {
                        StoreError::Serialize {
                            identifier: record.identifier.clone(),
                            source,
                        }
                    })?),
                    None => None,
                };
                inserted += stmt.execute(params![
                    record.identifier,
                    record.occurred_at.timestamp_millis(),
                    record.latitude,
                    record.longitude,
                    record.magnitude,
                    record.depth_meters,
                    record.name,
                    record.weblink,
                    record.detail_url,
                    record.provider.as_str(),
                    record.felt,
                    record.country_code,
                    cities_json,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM quakes", [])?;
        Ok(())
    }

    fn update_nearby_cities(
        &self,
        identifier: &str,
        cities: &[ParsedNearbyCity],
    ) -> Result<(), StoreError> {
        let cities_json =
            serde_json::to_string(cities).map_err(|source| StoreError::Serialize {
                identifier: identifier.to_string(),
                source,
            })?;
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE quakes SET nearby_cities_json = ?1 WHERE identifier = ?2",
            params![cities_json, identifier],
        )?;
        if changed == 0 {
            return Err(StoreError::MissingQuake {
                identifier: identifier.to_string(),
            });
        }
        Ok(())
    }

    fn update_country_code(&self, identifier: &str, code: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE quakes SET country_code = ?1 WHERE identifier = ?2",
            params![code, identifier],
        )?;
        if changed == 0 {
            return Err(StoreError::MissingQuake {
                identifier: identifier.to_string(),
            });
        }
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM quakes", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn all_identifiers(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT identifier FROM quakes ORDER BY identifier")?;
        let identifiers = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(identifiers)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<QuakeRecord> {
    let occurred_at_ms: i64 = row.get("occurred_at_ms")?;
    let provider: String = row.get("provider")?;
    let cities_json: Option<String> = row.get("nearby_cities_json")?;
    Ok(QuakeRecord {
        identifier: row.get("identifier")?,
        occurred_at: chrono::DateTime::from_timestamp_millis(occurred_at_ms)
            .unwrap_or_else(distant_future),
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        magnitude: row.get("magnitude")?,
        depth_meters: row.get("depth_meters")?,
        name: row.get("name")?,
        weblink: row.get("weblink")?,
        detail_url: row.get("detail_url")?,
        provider: Provider::from_str_lossy(&provider),
        felt: row.get("felt")?,
        country_code: row.get("country_code")?,
        // A corrupt blob reads back as "no cities" rather than failing the row.
        nearby_cities: cities_json.and_then(|json| serde_json::from_str(&json).ok()),
    })
}
