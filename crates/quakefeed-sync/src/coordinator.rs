//! End-to-end fetch orchestration.
//!
//! The coordinator picks the configured provider, runs the fetch through
//! the task graph, and merges parsed records into the store with
//! query-before-insert dedup. Every public operation returns a
//! [`FetchSummary`] — internal errors never escape as `Err`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tokio::sync::Mutex;

use quakefeed_core::{
    FeedConfig, FeedSettings, FetchCriterion, ParsedQuake, Provider, QuakeRecord,
};
use quakefeed_net::{
    parse, ActivityGauge, EmscQuery, FetchTask, ProviderQuery, QueryError, TaskContext, TaskGraph,
    UsgsQuery,
};
use quakefeed_store::{QuakeStore, StoreError};

use crate::summary::FetchSummary;

/// Errors internal to the sync layer. Only [`SyncCoordinator::from_config`]
/// exposes them; every fetch operation collapses them into a summary.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct SyncCoordinator {
    client: reqwest::Client,
    provider: Arc<dyn ProviderQuery>,
    store: Arc<dyn QuakeStore>,
    settings: FeedSettings,
    gauge: ActivityGauge,
    registration_url: Option<String>,
    /// Single-writer discipline for the merge step: overlapping fetches
    /// must not interleave their find-then-insert passes.
    merge_lock: Mutex<()>,
}

impl SyncCoordinator {
    /// Builds a coordinator for the configured provider, on top of `store`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] when the HTTP client cannot be constructed or
    /// a configured base URL does not parse.
    pub fn from_config(
        config: &FeedConfig,
        store: Arc<dyn QuakeStore>,
    ) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .build()?;
        let provider: Arc<dyn ProviderQuery> = match config.provider {
            Provider::Emsc => Arc::new(EmscQuery::new(&config.emsc_base_url)?),
            Provider::Usgs | Provider::Unknown => Arc::new(UsgsQuery::new(&config.usgs_base_url)?),
        };
        Ok(Self {
            client,
            provider,
            store,
            settings: config.settings,
            gauge: ActivityGauge::new(),
            registration_url: config.registration_url.clone(),
            merge_lock: Mutex::new(()),
        })
    }

    /// The shared network-activity gauge; clones observe the same counter.
    #[must_use]
    pub fn gauge(&self) -> ActivityGauge {
        self.gauge.clone()
    }

    /// Fetches quakes within the configured radius of a coordinate and
    /// merges them into the store.
    pub async fn fetch_by_location(&self, latitude: f64, longitude: f64) -> FetchSummary {
        self.fetch_and_merge(FetchCriterion::Location {
            latitude,
            longitude,
        })
        .await
    }

    /// Fetches worldwide quakes. `page` selects the month window on
    /// providers that paginate by date.
    pub async fn fetch_world(&self, page: u32) -> FetchSummary {
        self.fetch_and_merge(FetchCriterion::World { page }).await
    }

    /// Fetches major quakes only.
    pub async fn fetch_major(&self) -> FetchSummary {
        self.fetch_and_merge(FetchCriterion::Major).await
    }

    /// Deletes every persisted record, then fetches and merges fresh
    /// results for `criterion`. Used when the user changes search criteria:
    /// a full invalidate, not an incremental diff.
    ///
    /// The delete happens before the fetch resolves, so a fetch that then
    /// fails leaves the store empty. That mirrors the long-standing app
    /// behavior and is kept deliberately.
    pub async fn replace_all(&self, criterion: FetchCriterion) -> FetchSummary {
        {
            let _writer = self.merge_lock.lock().await;
            if let Err(error) = self.store.delete_all() {
                tracing::warn!(%error, "replace-all delete failed");
                return FetchSummary::Failed {
                    reason: error.to_string(),
                };
            }
        }
        self.fetch_and_merge(criterion).await
    }

    /// Resolves the detail document for a stored quake, follows the
    /// nearby-cities URL it names, and attaches the resulting city list to
    /// the record. A quake without a detail URL, or a detail document
    /// without the nested nearby-cities path, yields zero records rather
    /// than a failure.
    pub async fn fetch_detail_then_nearby_cities(&self, quake_id: &str) -> FetchSummary {
        let record = match self.store.find_by_identifier(quake_id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                return FetchSummary::Failed {
                    reason: format!("no stored quake with identifier {quake_id}"),
                }
            }
            Err(error) => {
                return FetchSummary::Failed {
                    reason: error.to_string(),
                }
            }
        };
        let Ok(detail_url) = Url::parse(&record.detail_url) else {
            tracing::debug!(quake_id, "no usable detail URL, skipping nearby cities");
            return FetchSummary::Merged { new_records: 0 };
        };

        let detail = Arc::new(FetchTask::get(detail_url, parse::parse_nearby_cities_url));
        let mut cities = FetchTask::deferred(
            {
                let detail = Arc::clone(&detail);
                move || {
                    detail
                        .output()
                        .flatten()
                        .and_then(|raw| Url::parse(&raw).ok())
                }
            },
            parse::parse_nearby_cities,
        );
        cities.after(&detail);
        let cities = Arc::new(cities);

        let mut graph = TaskGraph::serial();
        graph.add(Arc::clone(&detail));
        graph.add(Arc::clone(&cities));
        graph.run(&self.task_context()).await;

        if let Some(error) = detail.take_error().or_else(|| cities.take_error()) {
            tracing::warn!(quake_id, %error, "nearby-cities chain failed");
            return FetchSummary::Failed {
                reason: error.to_string(),
            };
        }
        let cities = cities.output().unwrap_or_default();
        if cities.is_empty() {
            return FetchSummary::Merged { new_records: 0 };
        }
        match self.store.update_nearby_cities(quake_id, &cities) {
            Ok(()) => FetchSummary::Merged {
                new_records: cities.len(),
            },
            Err(error) => FetchSummary::Failed {
                reason: error.to_string(),
            },
        }
    }

    /// Asks the provider how many quakes match `criterion` without fetching
    /// them. `None` on any failure.
    pub async fn quake_count(&self, criterion: FetchCriterion) -> Option<u64> {
        let url = self.provider.count_url(criterion, self.settings);
        let task = Arc::new(FetchTask::get(url, parse::parse_count));
        let mut graph = TaskGraph::concurrent();
        graph.add(Arc::clone(&task));
        graph.run(&self.task_context()).await;
        if let Some(error) = task.take_error() {
            tracing::warn!(%error, "count probe failed");
            return None;
        }
        task.output()
    }

    /// Registers a device token and location with the push endpoint. A thin
    /// sibling of the fetch pipeline: same task abstraction, POST instead
    /// of GET.
    pub async fn register_device(
        &self,
        token: &str,
        latitude: f64,
        longitude: f64,
    ) -> FetchSummary {
        let Some(raw) = &self.registration_url else {
            return FetchSummary::Failed {
                reason: "no registration endpoint configured".to_string(),
            };
        };
        let url = match Url::parse(raw) {
            Ok(url) => url,
            Err(error) => {
                return FetchSummary::Failed {
                    reason: format!("invalid registration URL \"{raw}\": {error}"),
                }
            }
        };
        let body = serde_json::json!({ "token": token, "lat": latitude, "long": longitude });
        let task = Arc::new(FetchTask::post(url, body, |bytes| {
            Ok::<_, quakefeed_net::ParseError>(bytes.to_vec())
        }));
        let mut graph = TaskGraph::concurrent();
        graph.add(Arc::clone(&task));
        graph.run(&self.task_context()).await;

        match task.take_error() {
            None => FetchSummary::Merged { new_records: 0 },
            Some(error) => FetchSummary::Failed {
                reason: error.to_string(),
            },
        }
    }

    /// Stores the country code an external geocoding collaborator resolved
    /// for a quake.
    pub fn update_country_code(&self, quake_id: &str, code: &str) -> FetchSummary {
        match self.store.update_country_code(quake_id, code) {
            Ok(()) => FetchSummary::Merged { new_records: 0 },
            Err(error) => FetchSummary::Failed {
                reason: error.to_string(),
            },
        }
    }

    async fn fetch_and_merge(&self, criterion: FetchCriterion) -> FetchSummary {
        let url = self.provider.query_url(criterion, self.settings);
        tracing::debug!(url = %url, ?criterion, "fetching quakes");
        let provider = Arc::clone(&self.provider);
        let task = Arc::new(FetchTask::get(url, move |bytes| provider.parse_feed(bytes)));
        let mut graph = TaskGraph::concurrent();
        graph.add(Arc::clone(&task));
        graph.run(&self.task_context()).await;

        if let Some(error) = task.take_error() {
            tracing::warn!(%error, "quake fetch failed");
            return FetchSummary::Failed {
                reason: error.to_string(),
            };
        }
        // No output and no error means the provider answered "no data"
        // (204/404) — an empty batch, not a failure.
        let quakes = task.output().unwrap_or_default();
        match self.merge(quakes).await {
            Ok(new_records) => FetchSummary::Merged { new_records },
            Err(error) => {
                tracing::warn!(%error, "merge failed");
                FetchSummary::Failed {
                    reason: error.to_string(),
                }
            }
        }
    }

    /// The merge step: query-before-insert per record, one batched commit
    /// per pass, all under the single-writer lock.
    async fn merge(&self, quakes: Vec<ParsedQuake>) -> Result<usize, StoreError> {
        let _writer = self.merge_lock.lock().await;
        let mut fresh: Vec<QuakeRecord> = Vec::new();
        for quake in quakes {
            if self.store.find_by_identifier(&quake.identifier)?.is_some() {
                continue;
            }
            if fresh.iter().any(|r| r.identifier == quake.identifier) {
                continue;
            }
            fresh.push(QuakeRecord::from(quake));
        }
        self.store.insert_all(&fresh)
    }

    fn task_context(&self) -> TaskContext {
        TaskContext::new(self.client.clone(), self.gauge.clone())
    }
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("provider", &self.provider.provider())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
