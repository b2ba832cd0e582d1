//! Provider-specific query building.
//!
//! Each provider is a small strategy behind [`ProviderQuery`]: it knows how
//! to spell a search or count URL for a [`FetchCriterion`] and how its feed
//! bodies decode. URL building is a pure function of criterion and settings,
//! so it is tested without any network.

mod emsc;
mod usgs;

pub use emsc::EmscQuery;
pub use usgs::UsgsQuery;

use reqwest::Url;

use quakefeed_core::{FeedSettings, FetchCriterion, ParsedQuake, Provider};

use crate::error::{ParseError, QueryError};
use crate::parse;

/// Magnitude floor for the major-quakes search.
pub const MAJOR_MAGNITUDE_THRESHOLD: f64 = 3.8;

/// WGS84 circumference approximation used to convert a search radius in
/// kilometers into degrees for providers that want angular distance.
const EARTH_CIRCUMFERENCE_KM: f64 = 40_000.0;

#[must_use]
pub fn radius_km_to_degrees(radius_km: f64) -> f64 {
    radius_km / EARTH_CIRCUMFERENCE_KM * 360.0
}

/// How one remote feed is queried and decoded.
pub trait ProviderQuery: Send + Sync {
    fn provider(&self) -> Provider;

    /// The fully-qualified search URL for `criterion`.
    fn query_url(&self, criterion: FetchCriterion, settings: FeedSettings) -> Url;

    /// The count-only probe URL for `criterion`.
    fn count_url(&self, criterion: FetchCriterion, settings: FeedSettings) -> Url;

    /// Decodes a feed body into canonical records.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the body is malformed or has an
    /// unexpected top-level shape.
    fn parse_feed(&self, bytes: &[u8]) -> Result<Vec<ParsedQuake>, ParseError> {
        parse::parse_quake_feed(bytes)
    }
}

/// Normalizes a configured base URL: exactly one trailing slash, so that
/// joining `query`/`count` appends a segment instead of replacing one.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, QueryError> {
    let normalized = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalized).map_err(|e| QueryError::InvalidBaseUrl {
        base_url: base_url.to_string(),
        reason: e.to_string(),
    })
}

/// Resolves the `query` and `count` endpoints under a base URL.
pub(crate) fn endpoints(base_url: &str) -> Result<(Url, Url), QueryError> {
    let base = parse_base_url(base_url)?;
    let join = |segment: &str| {
        base.join(segment).map_err(|e| QueryError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason: e.to_string(),
        })
    };
    Ok((join("query")?, join("count")?))
}
