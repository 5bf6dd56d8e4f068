//! Composition root for the exchange lifecycle engine.
//!
//! Connects to the database, wires up the event bus and the proposal
//! engine, and runs the expiry sweeper until shutdown. A presentation
//! layer embedding the engines does the same wiring and skips this binary.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tradepost_engine::{EngineConfig, ExpirySweeper, PgAccountResolver, ProposalEngine};
use tradepost_events::EventBus;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tradepost_worker=debug,tradepost_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = EngineConfig::from_env();
    tracing::info!(
        proposal_ttl_days = config.proposal_ttl_days,
        sweep_interval_secs = config.sweep_interval.as_secs(),
        "Loaded engine configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = tradepost_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    tradepost_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    tradepost_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Event bus ---
    let bus = Arc::new(EventBus::default());

    // Log every engine event while no external subscriber is wired up.
    let mut event_rx = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = event_rx.recv().await {
            tracing::debug!(
                kind = %event.kind,
                entity_id = ?event.entity_id,
                "Engine event"
            );
        }
    });

    // --- Engine + sweeper ---
    let accounts = Arc::new(PgAccountResolver::new(pool.clone()));
    let engine = Arc::new(ProposalEngine::new(
        pool.clone(),
        Arc::clone(&bus),
        accounts,
        config.clone(),
    ));

    let cancel = CancellationToken::new();
    let sweeper = ExpirySweeper::new(Arc::clone(&engine), config.sweep_interval);
    let sweeper_cancel = cancel.clone();
    let sweeper_handle = tokio::spawn(async move {
        sweeper.run(sweeper_cancel).await;
    });

    tracing::info!("Expiry sweeper running; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");

    tracing::info!("Shutdown signal received");
    cancel.cancel();
    let _ = sweeper_handle.await;
    tracing::info!("Worker stopped");
}
