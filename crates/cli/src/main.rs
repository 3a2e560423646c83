//! `repairbuddies` CLI entry-point.
//!
//! Available sub-commands:
//! - `serve`   start the API server.
//! - `migrate` run pending database migrations.
//! - `seed`    create the default locations and upcoming timeslots.
//! - `config`  print the effective configuration.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::AppState;
use db::{MemoryStore, PgStore, Store};
use matching::{LogNotifier, Services, TimeslotPlan};
use realtime::{AuthEvents, ChangeFeed};

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "repairbuddies",
    about = "Community repair matching: requests, timeslots and chat",
    version
)]
struct Cli {
    /// Configuration file (defaults to ./repairbuddies.toml).
    #[arg(long, global = true, env = "REPAIRBUDDIES_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the REST API server.
    Serve {
        /// Overrides `server.bind`.
        #[arg(long)]
        bind: Option<String>,
        /// Keep everything in memory instead of Postgres.
        #[arg(long)]
        in_memory: bool,
    },
    /// Run pending database migrations.
    Migrate,
    /// Create the default locations and generate upcoming timeslots.
    Seed {
        /// Overrides `booking.days_ahead`.
        #[arg(long)]
        days: Option<u32>,
        /// Overrides `booking.default_capacity`.
        #[arg(long)]
        capacity: Option<i32>,
    },
    /// Print the effective configuration as JSON.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config =
        Config::load_with_dotenv(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Command::Serve { bind, in_memory } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let addr = config.bind_addr()?;
            let store: Arc<dyn Store> = if in_memory {
                info!("Using in-memory store; data is lost on exit");
                Arc::new(MemoryStore::new())
            } else {
                Arc::new(connect(&config).await?)
            };
            let state = AppState::new(build_services(&config, store))
                .with_keep_alive(config.keep_alive());
            info!("Starting API server on {addr}");
            api::serve(addr, state).await.context("server stopped")?;
        }
        Command::Migrate => {
            let store = connect(&config).await?;
            db::pool::run_migrations(store.pool()).await.context("migration failed")?;
            info!("Migrations applied successfully");
        }
        Command::Seed { days, capacity } => {
            let store = connect(&config).await?;
            let services = build_services(&config, Arc::new(store));
            let locations = services.booking.seed_locations().await?;
            let plan = TimeslotPlan {
                start: Utc::now(),
                days: days.unwrap_or(config.booking.days_ahead),
                capacity: capacity.unwrap_or(config.booking.default_capacity),
            };
            let created = services.booking.generate_timeslots(plan).await?;
            println!(
                "Seeded {} locations and {} timeslots",
                locations.len(),
                created.len()
            );
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn connect(config: &Config) -> anyhow::Result<PgStore> {
    let pool = db::pool::create_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.acquire_timeout(),
    )
    .await
    .context("failed to connect to database")?;
    Ok(PgStore::new(pool))
}

fn build_services(config: &Config, store: Arc<dyn Store>) -> Services {
    let capacity = config.realtime.channel_capacity;
    Services::new(
        store,
        ChangeFeed::new(capacity),
        AuthEvents::new(capacity),
        Arc::new(LogNotifier),
        config.settings(),
    )
}
