//! USGS FDSN event service query builder.

use reqwest::Url;

use quakefeed_core::{FeedSettings, FetchCriterion, Provider};

use crate::error::QueryError;

use super::{endpoints, ProviderQuery, MAJOR_MAGNITUDE_THRESHOLD};

/// Builds `query`/`count` URLs for the USGS earthquake catalog.
///
/// USGS speaks GeoJSON and takes location parameters directly in kilometers
/// (`maxradiuskm`). The `limit` parameter is always appended last.
pub struct UsgsQuery {
    query_endpoint: Url,
    count_endpoint: Url,
}

impl UsgsQuery {
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidBaseUrl`] when `base_url` does not
    /// parse.
    pub fn new(base_url: &str) -> Result<Self, QueryError> {
        let (query_endpoint, count_endpoint) = endpoints(base_url)?;
        Ok(Self {
            query_endpoint,
            count_endpoint,
        })
    }

    fn apply_params(url: &mut Url, criterion: FetchCriterion, settings: FeedSettings) {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("format", "geojson");
        match criterion {
            FetchCriterion::Location {
                latitude,
                longitude,
            } => {
                pairs.append_pair("latitude", &latitude.to_string());
                pairs.append_pair("longitude", &longitude.to_string());
                pairs.append_pair(
                    "maxradiuskm",
                    &settings.search_radius.kilometers().to_string(),
                );
            }
            // USGS does not paginate the world feed by date; `page` only
            // matters to providers that do.
            FetchCriterion::World { .. } => {}
            FetchCriterion::Major => {
                pairs.append_pair("minmagnitude", &MAJOR_MAGNITUDE_THRESHOLD.to_string());
            }
        }
        pairs.append_pair("limit", &settings.fetch_limit.count().to_string());
    }
}

impl ProviderQuery for UsgsQuery {
    fn provider(&self) -> Provider {
        Provider::Usgs
    }

    fn query_url(&self, criterion: FetchCriterion, settings: FeedSettings) -> Url {
        let mut url = self.query_endpoint.clone();
        Self::apply_params(&mut url, criterion, settings);
        url
    }

    fn count_url(&self, criterion: FetchCriterion, settings: FeedSettings) -> Url {
        let mut url = self.count_endpoint.clone();
        Self::apply_params(&mut url, criterion, settings);
        url
    }
}
