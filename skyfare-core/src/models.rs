use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;
use crate::{CoreError, CoreResult};

/// Longest flight number accepted by the schedule loader.
pub const MAX_FLIGHT_NO_LEN: usize = 10;

/// A scheduled flight with its seat pool.
///
/// `seats_available` is owned by the inventory ledger and always stays in
/// `0..=total_seats`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flight {
    pub flight_id: i64,
    pub flight_no: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub base_fare_cents: i64,
    pub total_seats: i32,
    pub seats_available: i32,
    pub airline_name: String,
}

impl Flight {
    pub fn duration(&self) -> Duration {
        self.arrival - self.departure
    }

    pub fn seats_sold(&self) -> i32 {
        self.total_seats - self.seats_available
    }
}

/// Flight data as supplied by a schedule load, before it has an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFlight {
    pub flight_no: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub base_fare_cents: i64,
    pub total_seats: i32,
    pub seats_available: i32,
    pub airline_name: String,
}

impl NewFlight {
    pub fn validate(&self) -> CoreResult<()> {
        let flight_no = self.flight_no.trim();
        if flight_no.is_empty() || flight_no.chars().count() > MAX_FLIGHT_NO_LEN {
            return Err(CoreError::ValidationError(format!(
                "flight_no must be 1..={} characters",
                MAX_FLIGHT_NO_LEN
            )));
        }
        if self.arrival <= self.departure {
            return Err(CoreError::ValidationError("arrival must be after departure".to_string()));
        }
        if self.base_fare_cents < 0 {
            return Err(CoreError::ValidationError("base_fare must not be negative".to_string()));
        }
        if self.total_seats <= 0 {
            return Err(CoreError::ValidationError("total_seats must be positive".to_string()));
        }
        if self.seats_available < 0 || self.seats_available > self.total_seats {
            return Err(CoreError::ValidationError(format!(
                "seats_available must be within 0..={}",
                self.total_seats
            )));
        }
        Ok(())
    }

    pub fn into_flight(self, flight_id: i64) -> Flight {
        Flight {
            flight_id,
            flight_no: self.flight_no,
            origin: self.origin,
            destination: self.destination,
            departure: self.departure,
            arrival: self.arrival,
            base_fare_cents: self.base_fare_cents,
            total_seats: self.total_seats,
            seats_available: self.seats_available,
            airline_name: self.airline_name,
        }
    }
}

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    Pending,
    Reserved,
    Confirmed,
    #[serde(rename = "Payment Failed")]
    PaymentFailed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Reserved => "Reserved",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::PaymentFailed => "Payment Failed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    /// Whether a booking in this status occupies its seat. Payment Failed
    /// already gave the seat back, so only Reserved and Confirmed count.
    pub fn holds_seat(&self) -> bool {
        matches!(self, BookingStatus::Reserved | BookingStatus::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(BookingStatus::Pending),
            "Reserved" => Ok(BookingStatus::Reserved),
            "Confirmed" => Ok(BookingStatus::Confirmed),
            "Payment Failed" => Ok(BookingStatus::PaymentFailed),
            "Cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(CoreError::InternalError(format!("unknown booking status '{}'", other))),
        }
    }
}

/// A seat booking. Rows are never deleted; cancellation is a status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Booking {
    pub booking_id: i64,
    pub pnr: String,
    pub trans_id: String,
    pub flight_id: i64,
    pub flight_no: String,
    pub origin: String,
    pub destination: String,
    pub passenger_name: String,
    pub passenger_contact: String,
    pub seat_no: i32,
    pub status: BookingStatus,
    /// Fare snapshot taken at reservation time
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Booking row about to be inserted inside a flight transaction.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub pnr: String,
    pub trans_id: String,
    pub flight_id: i64,
    pub flight_no: String,
    pub origin: String,
    pub destination: String,
    pub passenger_name: String,
    pub passenger_contact: String,
    pub seat_no: i32,
    pub status: BookingStatus,
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl NewBooking {
    pub fn into_booking(self, booking_id: i64) -> Booking {
        Booking {
            booking_id,
            pnr: self.pnr,
            trans_id: self.trans_id,
            flight_id: self.flight_id,
            flight_no: self.flight_no,
            origin: self.origin,
            destination: self.destination,
            passenger_name: self.passenger_name,
            passenger_contact: self.passenger_contact,
            seat_no: self.seat_no,
            status: self.status,
            price_cents: self.price_cents,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// One row of the append-only fare log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FareHistoryEntry {
    pub flight_no: String,
    pub timestamp: DateTime<Utc>,
    pub fare_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FarePoint {
    pub timestamp: DateTime<Utc>,
    pub fare_cents: i64,
}

impl From<FareHistoryEntry> for FarePoint {
    fn from(entry: FareHistoryEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            fare_cents: entry.fare_cents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_flight() -> NewFlight {
        let departure = Utc::now() + Duration::days(2);
        NewFlight {
            flight_no: "AI101".to_string(),
            origin: "Delhi".to_string(),
            destination: "Mumbai".to_string(),
            departure,
            arrival: departure + Duration::hours(2),
            base_fare_cents: 500_000,
            total_seats: 100,
            seats_available: 100,
            airline_name: "Air India".to_string(),
        }
    }

    #[test]
    fn test_status_round_trip_through_str() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Reserved,
            BookingStatus::Confirmed,
            BookingStatus::PaymentFailed,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!("PAID".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_payment_failed_serializes_with_space() {
        let json = serde_json::to_string(&BookingStatus::PaymentFailed).unwrap();
        assert_eq!(json, "\"Payment Failed\"");
    }

    #[test]
    fn test_only_reserved_and_confirmed_hold_seats() {
        assert!(BookingStatus::Reserved.holds_seat());
        assert!(BookingStatus::Confirmed.holds_seat());
        assert!(!BookingStatus::Pending.holds_seat());
        assert!(!BookingStatus::PaymentFailed.holds_seat());
        assert!(!BookingStatus::Cancelled.holds_seat());
    }

    #[test]
    fn test_new_flight_validation() {
        assert!(sample_flight().validate().is_ok());

        let mut f = sample_flight();
        f.arrival = f.departure;
        assert!(matches!(f.validate(), Err(CoreError::ValidationError(_))));

        let mut f = sample_flight();
        f.total_seats = 0;
        f.seats_available = 0;
        assert!(f.validate().is_err());

        let mut f = sample_flight();
        f.seats_available = 101;
        assert!(f.validate().is_err());

        let mut f = sample_flight();
        f.flight_no = "AI101-EXTRA1".to_string();
        assert!(f.validate().is_err());

        let mut f = sample_flight();
        f.base_fare_cents = -1;
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_flight_no_length_counts_characters() {
        // ten characters, twenty bytes
        let mut f = sample_flight();
        f.flight_no = "ÄÖÜÄÖÜÄÖÜÄ".to_string();
        assert!(f.validate().is_ok());

        f.flight_no.push('Ü');
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_flight_duration() {
        let flight = sample_flight().into_flight(1);
        assert_eq!(flight.duration(), Duration::hours(2));
        assert_eq!(flight.seats_sold(), 0);
    }
}
