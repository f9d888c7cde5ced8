use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use skyfare_core::Flight;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Source of the demand factor: unmodelled market noise.
pub trait DemandSource: Send + Sync {
    /// Draw a demand factor within `[low, high]`.
    fn demand_factor(&self, low: f64, high: f64) -> f64;
}

/// Uniform draw from a seedable RNG
pub struct UniformDemand {
    rng: Mutex<StdRng>,
}

impl UniformDemand {
    pub fn from_entropy() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl DemandSource for UniformDemand {
    fn demand_factor(&self, low: f64, high: f64) -> f64 {
        // A poisoned RNG is still a usable RNG.
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(low..=high)
    }
}

/// Always returns the same factor, ignoring the configured range.
#[derive(Debug, Clone, Copy)]
pub struct FixedDemand(pub f64);

impl DemandSource for FixedDemand {
    fn demand_factor(&self, _low: f64, _high: f64) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Weight of seat scarcity; a full flight adds this much to the multiplier
    pub seat_weight: f64,

    /// Lower bound of the demand noise
    pub demand_low: f64,

    /// Upper bound of the demand noise
    pub demand_high: f64,

    /// Case-insensitive airline name fragments that price as the premium tier
    pub premium_markers: Vec<String>,

    pub premium_tier_factor: f64,

    pub standard_tier_factor: f64,

    /// No fare is ever quoted below this (in cents)
    pub floor_cents: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            seat_weight: 0.4,
            demand_low: -0.08,
            demand_high: 0.25,
            premium_markers: vec!["premium".to_string(), "air india".to_string()],
            premium_tier_factor: 0.12,
            standard_tier_factor: -0.03,
            floor_cents: 5_000,
        }
    }
}

/// Result of one pricing evaluation, factor by factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareQuote {
    pub seat_factor: f64,
    pub time_factor: f64,
    pub demand_factor: f64,
    pub tier_factor: f64,
    pub multiplier: f64,
    pub fare_cents: i64,
}

/// Dynamic fare engine.
///
/// Pure apart from the demand draw: it owns no data and needs no locking,
/// so one instance is shared by every request and background job.
pub struct PricingEngine {
    config: PricingConfig,
    demand: Box<dyn DemandSource>,
}

impl PricingEngine {
    pub fn new(config: PricingConfig, demand: Box<dyn DemandSource>) -> Self {
        Self { config, demand }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Scarcity component: 0 on an empty flight, `seat_weight` when full.
    pub fn seat_factor(&self, seats_available: i32, total_seats: i32) -> f64 {
        if total_seats <= 0 {
            return self.config.seat_weight;
        }
        let ratio = seats_available as f64 / total_seats as f64;
        self.config.seat_weight * (1.0 - ratio)
    }

    /// Last-minute premium, early-bird discount.
    pub fn time_factor(&self, departure: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let days = (departure - now).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY;

        if days <= 0.0 {
            0.6
        } else if days <= 1.0 {
            0.4
        } else if days <= 3.0 {
            0.2
        } else if days <= 7.0 {
            0.1
        } else {
            -0.05
        }
    }

    pub fn tier_factor(&self, airline_name: &str) -> f64 {
        let name = airline_name.to_lowercase();
        let premium = self
            .config
            .premium_markers
            .iter()
            .any(|marker| name.contains(&marker.to_lowercase()));

        if premium {
            self.config.premium_tier_factor
        } else {
            self.config.standard_tier_factor
        }
    }

    pub fn price(
        &self,
        base_fare_cents: i64,
        seats_available: i32,
        total_seats: i32,
        departure: DateTime<Utc>,
        airline_name: &str,
        now: DateTime<Utc>,
    ) -> FareQuote {
        let seat_factor = self.seat_factor(seats_available, total_seats);
        let time_factor = self.time_factor(departure, now);
        let demand_factor = self
            .demand
            .demand_factor(self.config.demand_low, self.config.demand_high);
        let tier_factor = self.tier_factor(airline_name);

        let multiplier = 1.0 + seat_factor + time_factor + demand_factor + tier_factor;
        let fare_cents = ((base_fare_cents as f64 * multiplier).round() as i64).max(self.config.floor_cents);

        FareQuote {
            seat_factor,
            time_factor,
            demand_factor,
            tier_factor,
            multiplier,
            fare_cents,
        }
    }

    /// Price a flight as it stands right now.
    pub fn quote(&self, flight: &Flight, now: DateTime<Utc>) -> FareQuote {
        self.price(
            flight.base_fare_cents,
            flight.seats_available,
            flight.total_seats,
            flight.departure,
            &flight.airline_name,
            now,
        )
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default(), Box::new(UniformDemand::from_entropy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn engine(demand: f64) -> PricingEngine {
        PricingEngine::new(PricingConfig::default(), Box::new(FixedDemand(demand)))
    }

    #[test]
    fn test_reference_fare() {
        let engine = engine(0.0);
        let now = Utc::now();

        let quote = engine.price(500_000, 100, 100, now + Duration::days(10), "Air India", now);

        assert_eq!(quote.seat_factor, 0.0);
        assert_eq!(quote.time_factor, -0.05);
        assert_eq!(quote.tier_factor, 0.12);
        assert!((quote.multiplier - 1.07).abs() < 1e-9);
        assert_eq!(quote.fare_cents, 535_000);
    }

    #[test]
    fn test_seat_factor() {
        let engine = engine(0.0);
        assert_eq!(engine.seat_factor(100, 100), 0.0);
        assert!((engine.seat_factor(0, 100) - 0.4).abs() < 1e-9);
        assert!((engine.seat_factor(50, 100) - 0.2).abs() < 1e-9);
        // unknown capacity prices as full
        assert!((engine.seat_factor(0, 0) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_time_bands() {
        let engine = engine(0.0);
        let now = Utc::now();

        assert_eq!(engine.time_factor(now - Duration::hours(1), now), 0.6);
        assert_eq!(engine.time_factor(now, now), 0.6);
        assert_eq!(engine.time_factor(now + Duration::hours(12), now), 0.4);
        assert_eq!(engine.time_factor(now + Duration::days(1), now), 0.4);
        assert_eq!(engine.time_factor(now + Duration::days(2), now), 0.2);
        assert_eq!(engine.time_factor(now + Duration::days(5), now), 0.1);
        assert_eq!(engine.time_factor(now + Duration::days(7), now), 0.1);
        assert_eq!(engine.time_factor(now + Duration::days(8), now), -0.05);
    }

    #[test]
    fn test_tier_factor() {
        let engine = engine(0.0);
        assert_eq!(engine.tier_factor("AIR INDIA"), 0.12);
        assert_eq!(engine.tier_factor("SkyHigh Premium"), 0.12);
        assert_eq!(engine.tier_factor("IndiGo"), -0.03);
    }

    #[test]
    fn test_fare_floor() {
        let engine = engine(-0.08);
        let now = Utc::now();

        let quote = engine.price(1_000, 10, 10, now + Duration::days(30), "IndiGo", now);
        assert_eq!(quote.fare_cents, 5_000);

        let free = engine.price(0, 10, 10, now, "IndiGo", now);
        assert_eq!(free.fare_cents, 5_000);
    }

    #[test]
    fn test_uniform_demand_stays_in_range() {
        let demand = UniformDemand::seeded(7);
        for _ in 0..1_000 {
            let d = demand.demand_factor(-0.08, 0.25);
            assert!((-0.08..=0.25).contains(&d));
        }
    }

    #[test]
    fn test_seeded_demand_is_reproducible() {
        let a = UniformDemand::seeded(42);
        let b = UniformDemand::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.demand_factor(-0.08, 0.25), b.demand_factor(-0.08, 0.25));
        }
    }
}
