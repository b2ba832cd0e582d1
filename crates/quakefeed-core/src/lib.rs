//! Canonical earthquake records, fetch criteria, and feed configuration
//! shared across the quakefeed crates.

pub mod config;
pub mod model;
pub mod settings;

pub use config::{build_feed_config, load_feed_config, load_feed_config_from_env, FeedConfig};
pub use model::{
    distant_future, FetchCriterion, ParsedNearbyCity, ParsedQuake, Provider, QuakeRecord,
};
pub use settings::{FeedSettings, FetchLimit, SearchRadius};

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
