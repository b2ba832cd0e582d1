//! EMSC (seismicportal) query builder.
//!
//! EMSC differs from USGS in three ways: it wants plain JSON, it takes the
//! location radius in degrees rather than kilometers, and its world feed is
//! paginated by date — each page is a one-month window counting back from
//! today.

use chrono::{DateTime, Months, NaiveDate, Utc};
use reqwest::Url;

use quakefeed_core::{FeedSettings, FetchCriterion, Provider};

use crate::error::QueryError;

use super::{endpoints, radius_km_to_degrees, ProviderQuery, MAJOR_MAGNITUDE_THRESHOLD};

pub struct EmscQuery {
    query_endpoint: Url,
    count_endpoint: Url,
}

impl EmscQuery {
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

    /// Like [`ProviderQuery::query_url`] but with an injected clock, so the
    /// month-window parameters are deterministic under test.
    #[must_use]
    pub fn query_url_at(
        &self,
        criterion: FetchCriterion,
        settings: FeedSettings,
        now: DateTime<Utc>,
    ) -> Url {
        let mut url = self.query_endpoint.clone();
        Self::apply_params(&mut url, criterion, settings, now);
        url
    }

    #[must_use]
    pub fn count_url_at(
        &self,
        criterion: FetchCriterion,
        settings: FeedSettings,
        now: DateTime<Utc>,
    ) -> Url {
        let mut url = self.count_endpoint.clone();
        Self::apply_params(&mut url, criterion, settings, now);
        url
    }

    fn apply_params(
        url: &mut Url,
        criterion: FetchCriterion,
        settings: FeedSettings,
        now: DateTime<Utc>,
    ) {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("limit", &settings.fetch_limit.count().to_string());
        if let FetchCriterion::Location {
            latitude,
            longitude,
        } = criterion
        {
            pairs.append_pair("lat", &latitude.to_string());
            pairs.append_pair("lon", &longitude.to_string());
            pairs.append_pair(
                "maxradius",
                &radius_km_to_degrees(settings.search_radius.kilometers()).to_string(),
            );
        }
        pairs.append_pair("format", "json");
        match criterion {
            FetchCriterion::World { page } => {
                let (starttime, endtime) = month_window(now.date_naive(), page);
                pairs.append_pair("endtime", &endtime.format("%Y-%m-%d").to_string());
                pairs.append_pair("starttime", &starttime.format("%Y-%m-%d").to_string());
            }
            FetchCriterion::Major => {
                pairs.append_pair("minmag", &MAJOR_MAGNITUDE_THRESHOLD.to_string());
            }
            FetchCriterion::Location { .. } => {}
        }
    }
}

/// The rolling one-month window for world page `page`: page 0 is the month
/// ending today, page 1 the month before that, and so on.
fn month_window(today: NaiveDate, page: u32) -> (NaiveDate, NaiveDate) {
    let end = today.checked_sub_months(Months::new(page)).unwrap_or(today);
    let start = end.checked_sub_months(Months::new(1)).unwrap_or(end);
    (start, end)
}

impl ProviderQuery for EmscQuery {
    fn provider(&self) -> Provider {
        Provider::Emsc
    }

    fn query_url(&self, criterion: FetchCriterion, settings: FeedSettings) -> Url {
        self.query_url_at(criterion, settings, Utc::now())
    }

    fn count_url(&self, criterion: FetchCriterion, settings: FeedSettings) -> Url {
        self.count_url_at(criterion, settings, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quakefeed_core::SearchRadius;

    fn builder() -> EmscQuery {
        EmscQuery::new("http://emsc.example/fdsnws/event/1/").unwrap()
    }

    fn fixed_now() -> DateTime<Utc> {
        "2026-08-15T09:30:00Z".parse().unwrap()
    }

    fn query_param(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn location_radius_is_converted_to_degrees() {
        let settings = FeedSettings {
            search_radius: SearchRadius::Medium, // 150 km
            ..FeedSettings::default()
        };
        let url = builder().query_url_at(
            FetchCriterion::Location {
                latitude: 35.3,
                longitude: 25.1,
            },
            settings,
            fixed_now(),
        );
        assert_eq!(query_param(&url, "lat").as_deref(), Some("35.3"));
        assert_eq!(query_param(&url, "lon").as_deref(), Some("25.1"));
        let degrees: f64 = query_param(&url, "maxradius").unwrap().parse().unwrap();
        assert!((degrees - 1.35).abs() < 1e-9, "got {degrees}");
        assert_eq!(query_param(&url, "format").as_deref(), Some("json"));
    }

    #[test]
    fn world_page_zero_is_the_month_ending_today() {
        let url = builder().query_url_at(FetchCriterion::world(), FeedSettings::default(), fixed_now());
        assert_eq!(query_param(&url, "endtime").as_deref(), Some("2026-08-15"));
        assert_eq!(query_param(&url, "starttime").as_deref(), Some("2026-07-15"));
    }

    #[test]
    fn world_page_offsets_the_window_by_whole_months() {
        let url = builder().query_url_at(
            FetchCriterion::World { page: 3 },
            FeedSettings::default(),
            fixed_now(),
        );
        assert_eq!(query_param(&url, "endtime").as_deref(), Some("2026-05-15"));
        assert_eq!(query_param(&url, "starttime").as_deref(), Some("2026-04-15"));
    }

    #[test]
    fn limit_comes_first_and_major_appends_minmag() {
        let url = builder().query_url_at(FetchCriterion::Major, FeedSettings::default(), fixed_now());
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs[0].0, "limit");
        assert_eq!(pairs[0].1, "225");
        assert_eq!(
            pairs.last().map(|(k, v)| (k.as_str(), v.as_str())),
            Some(("minmag", "3.8"))
        );
    }

    #[test]
    fn count_probe_targets_the_count_path() {
        let url = builder().count_url_at(FetchCriterion::world(), FeedSettings::default(), fixed_now());
        assert_eq!(url.path(), "/fdsnws/event/1/count");
        assert_eq!(query_param(&url, "limit").as_deref(), Some("225"));
    }
}
