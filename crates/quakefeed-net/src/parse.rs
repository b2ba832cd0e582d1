//! Normalizes raw provider JSON into canonical records.
//!
//! Both feeds are GeoJSON `FeatureCollection`s that differ only in which
//! identifier and link fields they carry, so one tolerant parser handles
//! both and tags each record with the provider it came from. The rules:
//! a feature without an identifier is skipped (never fatal to the batch),
//! every other missing field falls back to a default, and only a malformed
//! document or a missing `features` array fails the whole parse.

use chrono::{DateTime, Utc};
use serde_json::Value;

use quakefeed_core::{distant_future, ParsedNearbyCity, ParsedQuake, Provider};

use crate::error::ParseError;

const EMSC_EVENT_PAGE: &str = "http://www.emsc-csem.org/Earthquake/earthquake.php?id=";

/// Parses a quake feed body (USGS or EMSC) into canonical records.
///
/// # Errors
///
/// Returns [`ParseError`] when the body is not JSON or the top level has no
/// `features` array. Individual bad features never fail the batch.
pub fn parse_quake_feed(bytes: &[u8]) -> Result<Vec<ParsedQuake>, ParseError> {
    let root: Value = serde_json::from_slice(bytes).map_err(|source| ParseError::MalformedJson {
        context: "quake feed",
        source,
    })?;
    let features = root
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| ParseError::UnexpectedShape {
            context: "quake feed",
            reason: "missing 'features' array".to_string(),
        })?;

    Ok(features.iter().filter_map(parse_feature).collect())
}

/// Normalizes one GeoJSON feature, or `None` when it has no usable
/// identifier.
fn parse_feature(feature: &Value) -> Option<ParsedQuake> {
    let props = feature.get("properties").unwrap_or(&Value::Null);

    // USGS puts the stable ID on the feature; EMSC repeats it as `unid`.
    let identifier = feature
        .get("id")
        .and_then(value_as_string)
        .filter(|id| !id.is_empty())
        .or_else(|| {
            props
                .get("unid")
                .and_then(value_as_string)
                .filter(|id| !id.is_empty())
        })?;

    let (provider, link) = provider_and_link(props);

    let (longitude, latitude, depth_meters) = parse_coordinates(feature);

    Some(ParsedQuake {
        identifier,
        name: props
            .get("place")
            .or_else(|| props.get("flynn_region"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        link,
        detail_url: props
            .get("detail")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        occurred_at: props
            .get("time")
            .and_then(parse_event_time)
            .unwrap_or_else(distant_future),
        depth_meters,
        latitude,
        longitude,
        magnitude: props.get("mag").and_then(Value::as_f64).unwrap_or(0.0),
        felt: props.get("felt").and_then(Value::as_f64).unwrap_or(0.0),
        provider,
    })
}

/// A feature with `properties.url` came from USGS; one with
/// `properties.source_id` came from EMSC, which publishes no web link so one
/// is derived from the event page pattern.
fn provider_and_link(props: &Value) -> (Provider, String) {
    if let Some(url) = props.get("url").and_then(Value::as_str) {
        return (Provider::Usgs, url.to_string());
    }
    if let Some(source_id) = props.get("source_id").and_then(value_as_string) {
        return (Provider::Emsc, format!("{EMSC_EVENT_PAGE}{source_id}"));
    }
    (Provider::Unknown, String::new())
}

/// `geometry.coordinates` must be exactly `[lon, lat, depth_km]`; any other
/// shape defaults all three fields to 0 without rejecting the record. Depth
/// arrives in kilometers and is stored in meters.
fn parse_coordinates(feature: &Value) -> (f64, f64, f64) {
    let coords = feature
        .pointer("/geometry/coordinates")
        .and_then(Value::as_array);
    match coords {
        Some(coords) if coords.len() == 3 => {
            match (coords[0].as_f64(), coords[1].as_f64(), coords[2].as_f64()) {
                (Some(longitude), Some(latitude), Some(depth_km)) => {
                    (longitude, latitude, depth_km * 1000.0)
                }
                _ => (0.0, 0.0, 0.0),
            }
        }
        _ => (0.0, 0.0, 0.0),
    }
}

/// `time` is epoch milliseconds from USGS and an RFC 3339 string from EMSC.
fn parse_event_time(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(millis) = value.as_i64() {
        return DateTime::from_timestamp_millis(millis);
    }
    value
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|time| time.with_timezone(&Utc))
}

/// Parses a nearby-cities body: a JSON array of city objects. Every field
/// defaults, so every array element produces a record.
///
/// # Errors
///
/// Returns [`ParseError`] when the body is not JSON or the top level is not
/// an array.
pub fn parse_nearby_cities(bytes: &[u8]) -> Result<Vec<ParsedNearbyCity>, ParseError> {
    let root: Value = serde_json::from_slice(bytes).map_err(|source| ParseError::MalformedJson {
        context: "nearby cities",
        source,
    })?;
    let items = root.as_array().ok_or_else(|| ParseError::UnexpectedShape {
        context: "nearby cities",
        reason: "top level is not an array".to_string(),
    })?;

    Ok(items
        .iter()
        .map(|item| ParsedNearbyCity {
            city_name: item
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            direction: item
                .get("direction")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            distance_km: item.get("distance").and_then(Value::as_f64).unwrap_or(0.0),
            latitude: item.get("latitude").and_then(Value::as_f64).unwrap_or(0.0),
            longitude: item.get("longitude").and_then(Value::as_f64).unwrap_or(0.0),
        })
        .collect())
}

/// Resolves the nearby-cities URL buried in a quake detail document.
///
/// Returns `Ok(None)` when any level of the nested path is absent — the
/// dependent task then has no URL to fetch and cancels itself.
///
/// # Errors
///
/// Returns [`ParseError`] only when the body is not JSON at all.
pub fn parse_nearby_cities_url(bytes: &[u8]) -> Result<Option<String>, ParseError> {
    let root: Value = serde_json::from_slice(bytes).map_err(|source| ParseError::MalformedJson {
        context: "quake detail",
        source,
    })?;
    Ok(root
        .pointer("/properties/products/nearby-cities/0/contents/nearby-cities.json/url")
        .and_then(Value::as_str)
        .map(str::to_owned))
}

/// Parses a count-probe body: either `{"count": N, ...}` or a bare number.
///
/// # Errors
///
/// Returns [`ParseError`] when the body is not JSON or carries no numeric
/// count.
pub fn parse_count(bytes: &[u8]) -> Result<u64, ParseError> {
    let root: Value = serde_json::from_slice(bytes).map_err(|source| ParseError::MalformedJson {
        context: "quake count",
        source,
    })?;
    root.as_u64()
        .or_else(|| root.get("count").and_then(Value::as_u64))
        .ok_or_else(|| ParseError::UnexpectedShape {
            context: "quake count",
            reason: "no numeric 'count' field".to_string(),
        })
}

/// Stringifies a value that providers serve as either a string or a number.
fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
