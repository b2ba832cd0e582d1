//! Command-line driver for the quakefeed sync pipeline.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quakefeed_core::{load_feed_config, FetchCriterion};
use quakefeed_store::{QuakeStore, SqliteStore};
use quakefeed_sync::{FetchSummary, SyncCoordinator};

#[derive(Debug, Parser)]
#[command(name = "quakefeed")]
#[command(about = "Fetch earthquake data and sync it into the local store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch quakes near a coordinate.
    Location {
        latitude: f64,
        longitude: f64,
        /// Wipe the store first and keep only this fetch's results.
        #[arg(long)]
        replace: bool,
    },
    /// Fetch worldwide quakes.
    World {
        /// Month-window page for providers that paginate by date (0 = the
        /// month ending today).
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        replace: bool,
    },
    /// Fetch major quakes (magnitude 3.8 and up).
    Major {
        #[arg(long)]
        replace: bool,
    },
    /// Resolve and store the nearby-cities list for a stored quake.
    NearbyCities { identifier: String },
    /// Ask the provider how many quakes match, without fetching them.
    Count {
        #[arg(long)]
        major: bool,
    },
    /// Register a device token and location for push notifications.
    Register {
        token: String,
        latitude: f64,
        longitude: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let config = load_feed_config()?;
    let store = Arc::new(SqliteStore::open(&config.store_path)?) as Arc<dyn QuakeStore>;
    let coordinator = SyncCoordinator::from_config(&config, store)?;

    let summary = match cli.command {
        Commands::Location {
            latitude,
            longitude,
            replace,
        } => {
            let criterion = FetchCriterion::Location {
                latitude,
                longitude,
            };
            fetch(&coordinator, criterion, replace).await
        }
        Commands::World { page, replace } => {
            fetch(&coordinator, FetchCriterion::World { page }, replace).await
        }
        Commands::Major { replace } => fetch(&coordinator, FetchCriterion::Major, replace).await,
        Commands::NearbyCities { identifier } => {
            coordinator.fetch_detail_then_nearby_cities(&identifier).await
        }
        Commands::Count { major } => {
            let criterion = if major {
                FetchCriterion::Major
            } else {
                FetchCriterion::world()
            };
            match coordinator.quake_count(criterion).await {
                Some(count) => {
                    println!("{count}");
                    return Ok(ExitCode::SUCCESS);
                }
                None => FetchSummary::Failed {
                    reason: "count probe failed".to_string(),
                },
            }
        }
        Commands::Register {
            token,
            latitude,
            longitude,
        } => coordinator.register_device(&token, latitude, longitude).await,
    };

    println!("{summary}");
    if summary.is_failure() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn fetch(
    coordinator: &SyncCoordinator,
    criterion: FetchCriterion,
    replace: bool,
) -> FetchSummary {
    if replace {
        coordinator.replace_all(criterion).await
    } else {
        match criterion {
            FetchCriterion::Location {
                latitude,
                longitude,
            } => coordinator.fetch_by_location(latitude, longitude).await,
            FetchCriterion::World { page } => coordinator.fetch_world(page).await,
            FetchCriterion::Major => coordinator.fetch_major().await,
        }
    }
}
