//! Canonical quake model produced by the feed parsers and consumed by the
//! store and sync layers.
//!
//! `ParsedQuake` / `ParsedNearbyCity` are transient, produced once per fetch;
//! `QuakeRecord` is the persisted shape keyed by the provider-assigned
//! identifier. At most one record per identifier ever exists — the sync layer
//! enforces this by querying before insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which remote feed a record was normalized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Unknown,
    Usgs,
    Emsc,
}

impl Provider {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Unknown => "unknown",
            Provider::Usgs => "usgs",
            Provider::Emsc => "emsc",
        }
    }

    /// Parses the stored text form back into a variant. Unrecognized input
    /// maps to [`Provider::Unknown`] rather than failing — old rows must
    /// stay readable.
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "usgs" => Provider::Usgs,
            "emsc" => Provider::Emsc,
            _ => Provider::Unknown,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamp assigned when a feed record carries no usable `time` field.
///
/// Exactly 4001-01-01T00:00:00Z — millisecond-precise so it survives a
/// round trip through the store's epoch-millis column. Callers must treat
/// this as "unknown", never as a real future event.
#[must_use]
pub fn distant_future() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(64_092_211_200_000).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// One earthquake normalized from a provider feed.
///
/// Field defaults follow the tolerant parsing rules: a record is only ever
/// rejected for a missing identifier; every other gap falls back to an empty
/// string, zero, or the [`distant_future`] sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuake {
    /// Stable provider-assigned ID. Required and non-empty.
    pub identifier: String,
    pub name: String,
    /// Provider web page for the event. Derived for EMSC records.
    pub link: String,
    /// Secondary detail endpoint; empty when the provider offers none.
    pub detail_url: String,
    pub occurred_at: DateTime<Utc>,
    /// Depth in meters (feeds report kilometers; stored value is km × 1000).
    pub depth_meters: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub magnitude: f64,
    /// USGS felt-report count; 0.0 when absent.
    pub felt: f64,
    pub provider: Provider,
}

impl ParsedQuake {
    /// Whether `occurred_at` holds a real event time rather than the
    /// unknown-time sentinel.
    #[must_use]
    pub fn timestamp_known(&self) -> bool {
        self.occurred_at != distant_future()
    }
}

/// A city near a quake epicenter, resolved through the detail-URL chain.
///
/// Never rejected during parsing — every field has a default — and attached
/// to a stored quake as an opaque serialized blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedNearbyCity {
    pub city_name: String,
    pub direction: String,
    pub distance_km: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// The persisted quake shape used through the store contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuakeRecord {
    pub identifier: String,
    pub occurred_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub magnitude: f64,
    pub depth_meters: f64,
    pub name: String,
    pub weblink: String,
    pub detail_url: String,
    pub provider: Provider,
    pub felt: f64,
    pub country_code: Option<String>,
    pub nearby_cities: Option<Vec<ParsedNearbyCity>>,
}

impl From<ParsedQuake> for QuakeRecord {
    fn from(parsed: ParsedQuake) -> Self {
        QuakeRecord {
            identifier: parsed.identifier,
            occurred_at: parsed.occurred_at,
            latitude: parsed.latitude,
            longitude: parsed.longitude,
            magnitude: parsed.magnitude,
            depth_meters: parsed.depth_meters,
            name: parsed.name,
            weblink: parsed.link,
            detail_url: parsed.detail_url,
            provider: parsed.provider,
            felt: parsed.felt,
            country_code: None,
            nearby_cities: None,
        }
    }
}

/// What to ask a provider for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FetchCriterion {
    /// Quakes within the configured search radius of a coordinate.
    Location { latitude: f64, longitude: f64 },
    /// Worldwide quakes. `page` selects a one-month window counting back
    /// from now on providers that paginate by date (EMSC); others ignore it.
    World { page: u32 },
    /// Major quakes only (magnitude ≥ 3.8).
    Major,
}

impl FetchCriterion {
    #[must_use]
    pub fn world() -> Self {
        FetchCriterion::World { page: 0 }
    }
}
