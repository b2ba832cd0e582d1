//! Contract tests run against both store implementations.

use chrono::DateTime;

use quakefeed_core::{ParsedNearbyCity, Provider, QuakeRecord};
use quakefeed_store::{MemStore, QuakeStore, SqliteStore, StoreError};

fn record(identifier: &str) -> QuakeRecord {
    QuakeRecord {
        identifier: identifier.to_string(),
        occurred_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        latitude: 37.5,
        longitude: -122.1,
        magnitude: 4.2,
        depth_meters: 5000.0,
        name: "10km N of Nowhere".to_string(),
        weblink: "http://example.com/event".to_string(),
        detail_url: "http://example.com/detail".to_string(),
        provider: Provider::Usgs,
        felt: 2.0,
        country_code: None,
        nearby_cities: None,
    }
}

fn city() -> ParsedNearbyCity {
    ParsedNearbyCity {
        city_name: "Ridgecrest".to_string(),
        direction: "NNE".to_string(),
        distance_km: 12.0,
        latitude: 35.62,
        longitude: -117.67,
    }
}

fn each_store(check: impl Fn(&dyn QuakeStore)) {
    let sqlite = SqliteStore::open_in_memory().expect("failed to open sqlite store");
    check(&sqlite);
    let memory = MemStore::new();
    check(&memory);
}

#[test]
fn insert_then_find_round_trips_every_field() {
    each_store(|store| {
        let original = record("us1000abcd");
        assert_eq!(store.insert_all(std::slice::from_ref(&original)).unwrap(), 1);

        let found = store.find_by_identifier("us1000abcd").unwrap().unwrap();
        assert_eq!(found, original);
        assert!(store.find_by_identifier("unknown").unwrap().is_none());
    });
}

#[test]
fn duplicate_identifiers_are_not_inserted_twice() {
    each_store(|store| {
        assert_eq!(store.insert_all(&[record("us1000abcd")]).unwrap(), 1);
        // Same identifier again, in a batch with one genuinely new record.
        let inserted = store
            .insert_all(&[record("us1000abcd"), record("us2000efgh")])
            .unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(
            store.all_identifiers().unwrap(),
            vec!["us1000abcd".to_string(), "us2000efgh".to_string()]
        );
    });
}

#[test]
fn delete_all_empties_the_store() {
    each_store(|store| {
        store
            .insert_all(&[record("a"), record("b"), record("c")])
            .unwrap();
        assert_eq!(store.count().unwrap(), 3);
        store.delete_all().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.all_identifiers().unwrap().is_empty());
    });
}

#[test]
fn nearby_cities_attach_to_an_existing_record() {
    each_store(|store| {
        store.insert_all(&[record("us1000abcd")]).unwrap();
        store
            .update_nearby_cities("us1000abcd", &[city()])
            .unwrap();

        let found = store.find_by_identifier("us1000abcd").unwrap().unwrap();
        assert_eq!(found.nearby_cities, Some(vec![city()]));
    });
}

#[test]
fn nearby_cities_update_fails_for_a_missing_record() {
    each_store(|store| {
        let result = store.update_nearby_cities("ghost", &[city()]);
        assert!(matches!(
            result,
            Err(StoreError::MissingQuake { ref identifier }) if identifier == "ghost"
        ));
    });
}

#[test]
fn country_code_updates_an_existing_record_only() {
    each_store(|store| {
        store.insert_all(&[record("us1000abcd")]).unwrap();
        store.update_country_code("us1000abcd", "US").unwrap();
        let found = store.find_by_identifier("us1000abcd").unwrap().unwrap();
        assert_eq!(found.country_code.as_deref(), Some("US"));

        assert!(matches!(
            store.update_country_code("ghost", "US"),
            Err(StoreError::MissingQuake { .. })
        ));
    });
}

#[test]
fn records_with_cities_survive_the_blob_round_trip() {
    each_store(|store| {
        let mut original = record("with-cities");
        original.nearby_cities = Some(vec![city()]);
        original.country_code = Some("US".to_string());
        store.insert_all(std::slice::from_ref(&original)).unwrap();

        let found = store.find_by_identifier("with-cities").unwrap().unwrap();
        assert_eq!(found, original);
    });
}
