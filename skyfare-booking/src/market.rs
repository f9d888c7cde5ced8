use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use skyfare_catalog::InventoryLedger;
use skyfare_core::{CoreResult, Flight, Store};
use crate::fares::FareService;

/// Availability steps the market simulation draws from.
pub const MARKET_STEPS: [i32; 6] = [-3, -2, -1, 0, 1, 2];

pub trait StepSource: Send + Sync {
    fn step(&self) -> i32;
}

pub struct RandomSteps {
    rng: Mutex<StdRng>,
}

impl RandomSteps {
    pub fn from_entropy() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl StepSource for RandomSteps {
    fn step(&self) -> i32 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        MARKET_STEPS.choose(&mut *rng).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedStep(pub i32);

impl StepSource for FixedStep {
    fn step(&self) -> i32 {
        self.0
    }
}

/// Outcome of one pass over the schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub failed: usize,
}

/// Batch bodies of the two periodic market jobs.
///
/// Flights are handled one at a time, each under its own flight lock, and a
/// failure on one flight is logged without stopping the batch.
pub struct MarketSimulator {
    store: Arc<dyn Store>,
    ledger: InventoryLedger,
    fares: Arc<FareService>,
    steps: Box<dyn StepSource>,
}

impl MarketSimulator {
    pub fn new(store: Arc<dyn Store>, fares: Arc<FareService>, lock_wait: Duration) -> Self {
        Self {
            ledger: InventoryLedger::new(store.clone(), lock_wait),
            store,
            fares,
            steps: Box::new(RandomSteps::from_entropy()),
        }
    }

    pub fn with_steps(mut self, steps: Box<dyn StepSource>) -> Self {
        self.steps = steps;
        self
    }

    /// Nudge every flight's availability by a random step, then log its new fare.
    pub async fn perturb_market(&self) -> CoreResult<BatchReport> {
        let mut report = BatchReport::default();
        for flight in self.store.list_flights().await? {
            match self.perturb_flight(&flight).await {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    warn!(flight_no = %flight.flight_no, error = %e, "market perturbation failed for flight");
                    report.failed += 1;
                }
            }
        }
        info!(processed = report.processed, failed = report.failed, "market perturbation pass finished");
        Ok(report)
    }

    async fn perturb_flight(&self, flight: &Flight) -> CoreResult<()> {
        let delta = self.steps.step();
        let updated = self.ledger.perturb(flight.flight_id, delta).await?;
        self.fares.record_price(&updated, Utc::now()).await?;
        Ok(())
    }

    /// Log a fresh fare for every flight without touching availability.
    pub async fn record_prices(&self) -> CoreResult<BatchReport> {
        let mut report = BatchReport::default();
        for flight in self.store.list_flights().await? {
            match self.record_flight_price(&flight).await {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    warn!(flight_no = %flight.flight_no, error = %e, "price recording failed for flight");
                    report.failed += 1;
                }
            }
        }
        info!(processed = report.processed, failed = report.failed, "price history pass finished");
        Ok(report)
    }

    async fn record_flight_price(&self, flight: &Flight) -> CoreResult<()> {
        // Read availability under the flight lock, price after releasing it.
        let tx = self.ledger.open(flight.flight_id).await?;
        let current = tx.flight().clone();
        drop(tx);

        self.fares.record_price(&current, Utc::now()).await?;
        Ok(())
    }
}
