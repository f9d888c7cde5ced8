use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use skyfare_catalog::{sample_flights, FareQuote, PricingEngine};
use skyfare_core::search::{FlightSearch, SortBy};
use skyfare_core::{CoreError, CoreResult, FareHistoryEntry, FarePoint, Flight, NewFlight, Store};

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// A flight together with its fare at the moment it was viewed.
#[derive(Debug, Clone, Serialize)]
pub struct FlightView {
    #[serde(flatten)]
    pub flight: Flight,
    pub dynamic_price_cents: i64,
    pub duration_seconds: i64,
}

impl FlightView {
    fn new(flight: Flight, quote: &FareQuote) -> Self {
        let duration_seconds = flight.duration().num_seconds();
        Self {
            flight,
            dynamic_price_cents: quote.fare_cents,
            duration_seconds,
        }
    }
}

/// Read side of the schedule plus the fare history log.
pub struct FareService {
    store: Arc<dyn Store>,
    pricing: Arc<PricingEngine>,
}

impl FareService {
    pub fn new(store: Arc<dyn Store>, pricing: Arc<PricingEngine>) -> Self {
        Self { store, pricing }
    }

    pub fn pricing(&self) -> &Arc<PricingEngine> {
        &self.pricing
    }

    /// Every flight priced now. Nothing is logged.
    pub async fn list_flights(&self) -> CoreResult<Vec<FlightView>> {
        let now = Utc::now();
        Ok(self
            .store
            .list_flights()
            .await?
            .into_iter()
            .map(|flight| {
                let quote = self.pricing.quote(&flight, now);
                FlightView::new(flight, &quote)
            })
            .collect())
    }

    /// Price one flight and append the result to its fare history.
    pub async fn get_pricing(&self, flight_no: &str) -> CoreResult<FlightView> {
        let flight = self
            .store
            .get_flight_by_no(flight_no)
            .await?
            .ok_or_else(|| CoreError::FlightNotFound(flight_no.to_string()))?;

        let quote = self.record_price(&flight, Utc::now()).await?;
        Ok(FlightView::new(flight, &quote))
    }

    pub async fn search_flights(&self, search: &FlightSearch) -> CoreResult<Vec<FlightView>> {
        let now = Utc::now();
        let mut views: Vec<FlightView> = self
            .store
            .search_flights(search)
            .await?
            .into_iter()
            .map(|flight| {
                let quote = self.pricing.quote(&flight, now);
                FlightView::new(flight, &quote)
            })
            .collect();

        match search.sort_by {
            Some(SortBy::Price) => views.sort_by_key(|v| v.dynamic_price_cents),
            Some(SortBy::Duration) => views.sort_by_key(|v| v.duration_seconds),
            None => {}
        }
        Ok(views)
    }

    /// Add a flight to the schedule and log its opening fare.
    pub async fn create_flight(&self, flight: NewFlight) -> CoreResult<FlightView> {
        flight.validate()?;

        let created = self.store.create_flight(&flight).await?;
        let quote = self.record_price(&created, Utc::now()).await?;

        info!(flight_no = %created.flight_no, flight_id = created.flight_id, fare_cents = quote.fare_cents, "flight created");
        Ok(FlightView::new(created, &quote))
    }

    /// Most recent first. Unknown flight numbers simply have no history.
    pub async fn fare_history(&self, flight_no: &str, limit: Option<usize>) -> CoreResult<Vec<FarePoint>> {
        self.store
            .recent_fares(flight_no, limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
            .await
    }

    /// Price `flight` as of `now` and append the fare to the history log.
    pub async fn record_price(&self, flight: &Flight, now: DateTime<Utc>) -> CoreResult<FareQuote> {
        let quote = self.pricing.quote(flight, now);
        self.store
            .append_fare(&FareHistoryEntry {
                flight_no: flight.flight_no.clone(),
                timestamp: now,
                fare_cents: quote.fare_cents,
            })
            .await?;

        debug!(
            flight_no = %flight.flight_no,
            fare_cents = quote.fare_cents,
            multiplier = quote.multiplier,
            "fare recorded"
        );
        Ok(quote)
    }

    /// Load the sample schedule into an empty flight table. Returns how many
    /// flights were inserted.
    pub async fn seed_sample_flights(&self, now: DateTime<Utc>) -> CoreResult<usize> {
        if !self.store.list_flights().await?.is_empty() {
            return Ok(0);
        }

        let mut inserted = 0;
        for flight in sample_flights(now) {
            match self.store.create_flight(&flight).await {
                Ok(_) => inserted += 1,
                // another instance seeded first
                Err(CoreError::DuplicateFlight(_)) => {}
                Err(e) => return Err(e),
            }
        }
        info!(inserted, "sample flights seeded");
        Ok(inserted)
    }

    /// Log an opening fare for every flight that has none yet.
    pub async fn seed_initial_fares(&self, now: DateTime<Utc>) -> CoreResult<usize> {
        let mut recorded = 0;
        for flight in self.store.list_flights().await? {
            if !self.store.has_fare_history(&flight.flight_no).await? {
                self.record_price(&flight, now).await?;
                recorded += 1;
            }
        }
        if recorded > 0 {
            info!(recorded, "initial fares recorded");
        }
        Ok(recorded)
    }
}
