use std::sync::Arc;
use std::time::Duration;
use skyfare_booking::{BookingManager, FareService, PaymentOrchestrator};
use skyfare_catalog::{ExternalScheduleProvider, PricingConfig, PricingEngine};
use skyfare_core::payment::PaymentAdapter;
use skyfare_core::Store;
use skyfare_store::app_config::{BookingRules, PricingRules};

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingManager>,
    pub fares: Arc<FareService>,
    pub schedule: Arc<ExternalScheduleProvider>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        pricing: Arc<PricingEngine>,
        payment_adapter: Arc<dyn PaymentAdapter>,
        rules: &BookingRules,
    ) -> Self {
        let bookings = BookingManager::new(
            store.clone(),
            pricing.clone(),
            PaymentOrchestrator::new(payment_adapter),
            Duration::from_millis(rules.lock_wait_ms),
        )
        .with_max_identifier_attempts(rules.max_identifier_attempts);

        Self {
            bookings: Arc::new(bookings),
            fares: Arc::new(FareService::new(store, pricing)),
            schedule: Arc::new(ExternalScheduleProvider::from_entropy()),
        }
    }
}

pub fn pricing_config(rules: &PricingRules) -> PricingConfig {
    PricingConfig {
        seat_weight: rules.seat_weight,
        demand_low: rules.demand_low,
        demand_high: rules.demand_high,
        premium_markers: rules.premium_markers.clone(),
        premium_tier_factor: rules.premium_tier_factor,
        standard_tier_factor: rules.standard_tier_factor,
        floor_cents: rules.floor_cents,
    }
}

/// Cents to a two-decimal amount for JSON output.
pub fn to_amount(cents: i64) -> f64 {
    cents as f64 / 100.0
}
