use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use skyfare_core::NewFlight;

pub const MOCK_PROVIDER: &str = "mock-airline";

const MOCK_AIRLINES: [&str; 4] = ["Air India", "IndiGo", "Vistara", "SpiceJet"];
const MOCK_BLOCK_MINUTES: [i64; 4] = [60, 120, 150, 180];

/// Schedule loaded into an empty database on first start.
pub fn sample_flights(now: DateTime<Utc>) -> Vec<NewFlight> {
    let flight = |flight_no: &str, origin: &str, destination: &str, days: i64, block: Duration, fare: i64, seats: i32, airline: &str| {
        let departure = now + Duration::days(days);
        NewFlight {
            flight_no: flight_no.to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure,
            arrival: departure + block,
            base_fare_cents: fare,
            total_seats: seats,
            seats_available: seats,
            airline_name: airline.to_string(),
        }
    };

    vec![
        flight("AI101", "Delhi", "Mumbai", 2, Duration::hours(2), 500_000, 100, "Air India"),
        flight("AI102", "Bangalore", "Chennai", 3, Duration::minutes(90), 450_000, 120, "Air India Premium"),
        flight("AI103", "Mumbai", "Kolkata", 4, Duration::hours(3), 600_000, 150, "Air India"),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalFlight {
    pub external_flight_no: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub available_seats: i32,
    pub price_cents: i64,
    pub airline_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalSchedule {
    pub provider: String,
    pub results: Vec<ExternalFlight>,
}

/// Stand-in for a partner airline's schedule feed.
pub struct ExternalScheduleProvider {
    rng: Mutex<StdRng>,
}

impl ExternalScheduleProvider {
    pub fn from_entropy() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    /// Three itineraries departing 4, 7 and 10 hours from `now`.
    pub fn schedule(&self, origin: &str, destination: &str, airline_name: Option<&str>, now: DateTime<Utc>) -> ExternalSchedule {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        let results = (0..3)
            .map(|i| {
                let departure = now + Duration::hours(4 + i * 3);
                let block = MOCK_BLOCK_MINUTES.choose(&mut *rng).copied().unwrap_or(120);
                let airline = match airline_name {
                    Some(name) => name.to_string(),
                    None => MOCK_AIRLINES.choose(&mut *rng).copied().unwrap_or("Air India").to_string(),
                };
                let prefix: String = airline.chars().take(2).collect::<String>().to_uppercase();

                ExternalFlight {
                    external_flight_no: format!("{}{}", prefix, rng.gen_range(100..=999)),
                    origin: origin.to_string(),
                    destination: destination.to_string(),
                    departure,
                    arrival: departure + Duration::minutes(block),
                    available_seats: rng.gen_range(10..=100),
                    price_cents: rng.gen_range(300_000..=1_000_000),
                    airline_name: airline,
                }
            })
            .collect();

        ExternalSchedule {
            provider: MOCK_PROVIDER.to_string(),
            results,
        }
    }
}

impl Default for ExternalScheduleProvider {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_flights_are_valid() {
        let flights = sample_flights(Utc::now());
        assert_eq!(flights.len(), 3);
        for flight in &flights {
            flight.validate().unwrap();
        }
        assert_eq!(flights[0].flight_no, "AI101");
    }

    #[test]
    fn test_external_schedule_shape() {
        let provider = ExternalScheduleProvider::seeded(1);
        let now = Utc::now();
        let schedule = provider.schedule("Delhi", "Goa", Some("Vistara"), now);

        assert_eq!(schedule.provider, MOCK_PROVIDER);
        assert_eq!(schedule.results.len(), 3);
        for (i, f) in schedule.results.iter().enumerate() {
            assert_eq!(f.airline_name, "Vistara");
            assert!(f.external_flight_no.starts_with("VI"));
            assert_eq!(f.departure, now + Duration::hours(4 + i as i64 * 3));
            assert!(f.arrival > f.departure);
            assert!((10..=100).contains(&f.available_seats));
            assert!((300_000..=1_000_000).contains(&f.price_cents));
        }
    }
}
