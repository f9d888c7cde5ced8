use anyhow::Context;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use skyfare_api::{app, state::{pricing_config, AppState}, worker};
use skyfare_booking::{MarketSimulator, SimulatedPaymentAdapter};
use skyfare_catalog::{PricingEngine, UniformDemand};
use skyfare_core::Store;
use skyfare_store::app_config::{Config, StorageBackend};
use skyfare_store::{DbClient, InMemoryStore, PgStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skyfare_api=debug,skyfare_booking=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Skyfare API on port {}", config.server.port);

    let store: Arc<dyn Store> = match config.storage.backend {
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Arc::new(PgStore::new(db.pool.clone()))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store, nothing survives a restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let pricing = Arc::new(PricingEngine::new(
        pricing_config(&config.pricing),
        Box::new(UniformDemand::from_entropy()),
    ));
    let payments = Arc::new(SimulatedPaymentAdapter::new(config.booking.payment_success_rate));
    let app_state = AppState::new(store.clone(), pricing, payments, &config.booking);

    let now = Utc::now();
    if config.seed.sample_flights {
        app_state.fares.seed_sample_flights(now).await?;
    }
    app_state.fares.seed_initial_fares(now).await?;

    let scheduler = if config.scheduler.enabled {
        let market = MarketSimulator::new(
            store,
            app_state.fares.clone(),
            Duration::from_millis(config.booking.lock_wait_ms),
        );
        Some(worker::start_market_scheduler(Arc::new(market), &config.scheduler))
    } else {
        None
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
