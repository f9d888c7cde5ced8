use async_trait::async_trait;
use std::time::Duration;
use crate::models::{Booking, BookingStatus, FareHistoryEntry, FarePoint, Flight, NewBooking, NewFlight};
use crate::search::FlightSearch;
use crate::CoreResult;

/// Repository trait for flight schedule access
#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn list_flights(&self) -> CoreResult<Vec<Flight>>;

    async fn get_flight(&self, flight_id: i64) -> CoreResult<Option<Flight>>;

    async fn get_flight_by_no(&self, flight_no: &str) -> CoreResult<Option<Flight>>;

    async fn search_flights(&self, search: &FlightSearch) -> CoreResult<Vec<Flight>>;

    /// Insert a flight. Fails with `DuplicateFlight` if the flight number is taken.
    async fn create_flight(&self, flight: &NewFlight) -> CoreResult<Flight>;
}

/// Read side of the booking table. All writes go through a [`FlightTransaction`].
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn list_bookings(&self) -> CoreResult<Vec<Booking>>;

    async fn get_booking(&self, pnr: &str) -> CoreResult<Option<Booking>>;

    async fn pnr_exists(&self, pnr: &str) -> CoreResult<bool>;

    async fn trans_id_exists(&self, trans_id: &str) -> CoreResult<bool>;
}

/// Append-only fare log
#[async_trait]
pub trait FareHistoryRepository: Send + Sync {
    async fn append_fare(&self, entry: &FareHistoryEntry) -> CoreResult<()>;

    /// Most recent first, at most `limit` points.
    async fn recent_fares(&self, flight_no: &str, limit: usize) -> CoreResult<Vec<FarePoint>>;

    async fn has_fare_history(&self, flight_no: &str) -> CoreResult<bool>;
}

/// Hands out exclusive, per-flight units of work.
#[async_trait]
pub trait FlightLocks: Send + Sync {
    /// Lock one flight for the duration of the returned transaction.
    ///
    /// Waits at most `wait` for the lock and fails with `CoreError::Busy`
    /// afterwards. Unknown flights fail with `CoreError::FlightNotFound`.
    async fn lock_flight(&self, flight_id: i64, wait: Duration) -> CoreResult<Box<dyn FlightTransaction>>;
}

/// An exclusive unit of work over one flight and its bookings.
///
/// Nothing written through a transaction is visible to others until
/// [`FlightTransaction::commit`] succeeds. Dropping it uncommitted discards
/// every staged change and releases the lock.
#[async_trait]
pub trait FlightTransaction: Send {
    /// The locked flight, including any availability change staged so far.
    fn flight(&self) -> &Flight;

    async fn set_seats_available(&mut self, seats_available: i32) -> CoreResult<()>;

    /// The booking currently holding `seat_no` on this flight, if any.
    async fn seat_holder(&mut self, seat_no: i32) -> CoreResult<Option<Booking>>;

    /// Look a booking of this flight up by PNR.
    async fn find_booking(&mut self, pnr: &str) -> CoreResult<Option<Booking>>;

    async fn insert_booking(&mut self, booking: NewBooking) -> CoreResult<Booking>;

    async fn update_booking_status(&mut self, booking_id: i64, status: BookingStatus) -> CoreResult<Booking>;

    async fn commit(self: Box<Self>) -> CoreResult<()>;
}

/// Everything the booking engine needs from persistence.
pub trait Store: FlightRepository + BookingRepository + FareHistoryRepository + FlightLocks {}

impl<T> Store for T where T: FlightRepository + BookingRepository + FareHistoryRepository + FlightLocks {}
