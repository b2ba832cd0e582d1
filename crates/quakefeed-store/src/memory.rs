//! In-memory quake store for deterministic tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use quakefeed_core::{ParsedNearbyCity, QuakeRecord};

use crate::{QuakeStore, StoreError};

/// A [`QuakeStore`] over a `BTreeMap`, keyed by identifier.
#[derive(Debug, Default)]
pub struct MemStore {
    records: Mutex<BTreeMap<String, QuakeRecord>>,
}

impl MemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuakeStore for MemStore {
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<QuakeRecord>, StoreError> {
        Ok(self.records.lock().unwrap().get(identifier).cloned())
    }

    fn insert_all(&self, records: &[QuakeRecord]) -> Result<usize, StoreError> {
        let mut map = self.records.lock().unwrap();
        let mut inserted = 0;
        for record in records {
            if map.contains_key(&record.identifier) {
                continue;
            }
            map.insert(record.identifier.clone(), record.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        self.records.lock().unwrap().clear();
        Ok(())
    }

    fn update_nearby_cities(
        &self,
        identifier: &str,
        cities: &[ParsedNearbyCity],
    ) -> Result<(), StoreError> {
        let mut map = self.records.lock().unwrap();
        let record = map
            .get_mut(identifier)
            .ok_or_else(|| StoreError::MissingQuake {
                identifier: identifier.to_string(),
            })?;
        record.nearby_cities = Some(cities.to_vec());
        Ok(())
    }

    fn update_country_code(&self, identifier: &str, code: &str) -> Result<(), StoreError> {
        let mut map = self.records.lock().unwrap();
        let record = map
            .get_mut(identifier)
            .ok_or_else(|| StoreError::MissingQuake {
                identifier: identifier.to_string(),
            })?;
        record.country_code = Some(code.to_string());
        Ok(())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.lock().unwrap().len())
    }

    fn all_identifiers(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.records.lock().unwrap().keys().cloned().collect())
    }
}
