//! Feed configuration loaded from environment variables.
//!
//! Every key has a sensible default, so an empty environment yields a
//! working config pointed at the public FDSN hosts. The parsing core takes
//! an injected lookup function so tests drive it with a plain `HashMap`
//! instead of mutating process env vars.

use std::path::PathBuf;

use crate::model::Provider;
use crate::settings::{parse_tier, FeedSettings};
use crate::ConfigError;

const DEFAULT_USGS_BASE_URL: &str = "https://earthquake.usgs.gov/fdsnws/event/1/";
const DEFAULT_EMSC_BASE_URL: &str = "https://www.seismicportal.eu/fdsnws/event/1/";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_USER_AGENT: &str = "quakefeed/0.1 (+https://github.com/quakefeed)";
const DEFAULT_STORE_PATH: &str = "quakefeed.sqlite";

/// Everything the fetch pipeline reads at startup.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub usgs_base_url: String,
    pub emsc_base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Which feed the coordinator queries by default.
    pub provider: Provider,
    pub settings: FeedSettings,
    pub store_path: PathBuf,
    /// Push-registration endpoint. `None` disables device registration.
    pub registration_url: Option<String>,
}

/// Load configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to pick up `.env` files before reading.
///
/// # Errors
///
/// Returns [`ConfigError`] if a set variable holds an unparseable value.
pub fn load_feed_config() -> Result<FeedConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_feed_config_from_env()
}

/// Load configuration from variables already in the process environment,
/// without touching `.env` files.
///
/// # Errors
///
/// Returns [`ConfigError`] if a set variable holds an unparseable value.
pub fn load_feed_config_from_env() -> Result<FeedConfig, ConfigError> {
    build_feed_config(|key| std::env::var(key))
}

/// Build a config using the provided env-var lookup function.
///
/// # Errors
///
/// Returns [`ConfigError`] if a present variable holds an unparseable value.
/// Absent variables fall back to defaults and never error.
pub fn build_feed_config<F>(lookup: F) -> Result<FeedConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default =
        |var: &str, default: &str| -> String { lookup(var).unwrap_or_else(|_| default.to_string()) };

    let request_timeout_secs = match lookup("QUAKEFEED_REQUEST_TIMEOUT_SECS") {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: "QUAKEFEED_REQUEST_TIMEOUT_SECS".to_string(),
                reason: e.to_string(),
            })?,
        Err(_) => DEFAULT_REQUEST_TIMEOUT_SECS,
    };

    let provider = match lookup("QUAKEFEED_PROVIDER") {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "usgs" => Provider::Usgs,
            "emsc" => Provider::Emsc,
            other => {
                return Err(ConfigError::InvalidEnvVar {
                    var: "QUAKEFEED_PROVIDER".to_string(),
                    reason: format!("unknown provider '{other}', expected usgs or emsc"),
                })
            }
        },
        Err(_) => Provider::Usgs,
    };

    let mut settings = FeedSettings::default();
    if let Ok(raw) = lookup("QUAKEFEED_FETCH_LIMIT") {
        settings.fetch_limit = parse_tier("QUAKEFEED_FETCH_LIMIT", &raw)?.into();
    }
    if let Ok(raw) = lookup("QUAKEFEED_SEARCH_RADIUS") {
        settings.search_radius = parse_tier("QUAKEFEED_SEARCH_RADIUS", &raw)?.into();
    }

    Ok(FeedConfig {
        usgs_base_url: or_default("QUAKEFEED_USGS_BASE_URL", DEFAULT_USGS_BASE_URL),
        emsc_base_url: or_default("QUAKEFEED_EMSC_BASE_URL", DEFAULT_EMSC_BASE_URL),
        request_timeout_secs,
        user_agent: or_default("QUAKEFEED_USER_AGENT", DEFAULT_USER_AGENT),
        provider,
        settings,
        store_path: PathBuf::from(or_default("QUAKEFEED_STORE_PATH", DEFAULT_STORE_PATH)),
        registration_url: lookup("QUAKEFEED_REGISTRATION_URL").ok(),
    })
}
