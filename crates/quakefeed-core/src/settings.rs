//! User-tunable fetch settings: how many results to ask a provider for and
//! how wide a location search reaches.

use crate::ConfigError;

/// Result-count cap appended to every provider query as `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchLimit {
    Small,
    #[default]
    Medium,
    Large,
    ExtraLarge,
}

impl FetchLimit {
    #[must_use]
    pub fn count(self) -> u32 {
        match self {
            FetchLimit::Small => 100,
            FetchLimit::Medium => 225,
            FetchLimit::Large => 400,
            FetchLimit::ExtraLarge => 1000,
        }
    }
}

/// Radius for location searches, in kilometers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchRadius {
    Small,
    #[default]
    Medium,
    Large,
    ExtraLarge,
}

impl SearchRadius {
    #[must_use]
    pub fn kilometers(self) -> f64 {
        match self {
            SearchRadius::Small => 50.0,
            SearchRadius::Medium => 150.0,
            SearchRadius::Large => 275.0,
            SearchRadius::ExtraLarge => 750.0,
        }
    }
}

/// The pair of tunables every query builder reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedSettings {
    pub fetch_limit: FetchLimit,
    pub search_radius: SearchRadius,
}

/// Parses a tier name (`small`/`medium`/`large`/`extra-large`) for the
/// env var `var`.
pub(crate) fn parse_tier(var: &str, raw: &str) -> Result<Tier, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "small" => Ok(Tier::Small),
        "medium" => Ok(Tier::Medium),
        "large" => Ok(Tier::Large),
        "extra-large" | "extralarge" | "xl" => Ok(Tier::ExtraLarge),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("unknown tier '{other}', expected small/medium/large/extra-large"),
        }),
    }
}

/// Size tier shared by both settings before they pick concrete values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tier {
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl From<Tier> for FetchLimit {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Small => FetchLimit::Small,
            Tier::Medium => FetchLimit::Medium,
            Tier::Large => FetchLimit::Large,
            Tier::ExtraLarge => FetchLimit::ExtraLarge,
        }
    }
}

impl From<Tier> for SearchRadius {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Small => SearchRadius::Small,
            Tier::Medium => SearchRadius::Medium,
            Tier::Large => SearchRadius::Large,
            Tier::ExtraLarge => SearchRadius::ExtraLarge,
        }
    }
}
