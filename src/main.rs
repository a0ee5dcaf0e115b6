//! Nowhere - ephemeral geospatial intent store
//!
//! Runs the store with its background maintenance until Ctrl-C.

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nowhere::{
    config::Args,
    domain::SystemClock,
    services::{spawn_reaper_task, AllowAll, InMemoryMetrics, ServiceDeps, Services},
    store::{spawn_sweeper_task, MemoryBackend},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("nowhere={},info", args.log_level).into());
    tracing_subscriber::registry()
        .with(filter)
        .with(args.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!args.log_json).then(tracing_subscriber::fmt::layer))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Nowhere - ephemeral intent store");
    info!("======================================");
    info!("Intent TTL: {}s", args.intent_ttl_secs);
    info!("Message history: {}", args.message_history);
    info!("Flag threshold: {}", args.flag_threshold);
    info!("Unverified radius: {} km", args.unverified_radius_km);
    info!("======================================");

    let backend = Arc::new(MemoryBackend::new());
    let metrics = Arc::new(InMemoryMetrics::new());

    let services = Services::new(ServiceDeps {
        backend: backend.clone(),
        clock: Arc::new(SystemClock),
        policy: Arc::new(AllowAll),
        metrics: metrics.clone(),
        store_config: args.store_config(),
        ranking: args.ranking_config(),
        query_defaults: args.query_defaults(),
    });

    let sweeper = spawn_sweeper_task(backend.clone(), args.sweep_interval());
    let reaper = spawn_reaper_task(services.reaper.clone(), args.reap_interval());

    if let Some((latitude, longitude)) = args.seed.location() {
        match services
            .seeder
            .seed(latitude, longitude, args.seed.seed_count, args.seed.seed_radius_km)
            .await
        {
            Ok(seeded) => info!(count = seeded.len(), "Ambient intents seeded"),
            Err(e) => warn!(error = %e, "Ambient seeding failed"),
        }
    }

    let mut stats = tokio::time::interval(args.stats_interval());
    loop {
        tokio::select! {
            _ = stats.tick() => {
                let store = backend.stats().await;
                let counters = metrics.snapshot();
                info!(
                    keys = store.keys,
                    commands = store.commands,
                    batches = store.batches,
                    batches_failed = store.batches_failed,
                    expired_purged = store.expired_purged,
                    intents_created = counters.intents_created,
                    joins = counters.joins,
                    messages = counters.messages,
                    flags = counters.flags,
                    "Stats"
                );
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutting down");
    sweeper.abort();
    reaper.abort();
    Ok(())
}
