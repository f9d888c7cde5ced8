pub mod models;
pub mod search;
pub mod repository;
pub mod payment;

pub use models::{Booking, BookingStatus, FareHistoryEntry, FarePoint, Flight, NewBooking, NewFlight};
pub use repository::{BookingRepository, FareHistoryRepository, FlightLocks, FlightRepository, FlightTransaction, Store};

/// Coarse classification of [`CoreError`], used by outer layers to pick a
/// response and by callers to decide whether a retry makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    ConcurrencyBusy,
    InvalidTransition,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Flight not found: {0}")]
    FlightNotFound(String),
    #[error("Booking not found: {0}")]
    BookingNotFound(String),
    #[error("Invalid seat number {seat_no}: flight has seats 1..={total_seats}")]
    InvalidSeat { seat_no: i32, total_seats: i32 },
    #[error("Seat {seat_no} on flight {flight_no} is already booked")]
    SeatTaken { flight_no: String, seat_no: i32 },
    #[error("Flight {0} is sold out")]
    SoldOut(String),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Flight number already exists: {0}")]
    DuplicateFlight(String),
    #[error("Transaction id already in use: {0}")]
    DuplicateTransaction(String),
    /// A generated PNR or transaction id collided at commit time. The
    /// booking manager retries the whole reservation when it sees this.
    #[error("Identifier collision: {0}")]
    IdentifierCollision(String),
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },
    #[error("Resource busy, retry later: {0}")]
    Busy(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::FlightNotFound(_) | CoreError::BookingNotFound(_) => ErrorKind::NotFound,
            CoreError::InvalidSeat { .. } | CoreError::ValidationError(_) => ErrorKind::Validation,
            CoreError::SeatTaken { .. }
            | CoreError::SoldOut(_)
            | CoreError::DuplicateFlight(_)
            | CoreError::DuplicateTransaction(_) => ErrorKind::Conflict,
            CoreError::Busy(_) => ErrorKind::ConcurrencyBusy,
            CoreError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            CoreError::IdentifierCollision(_) | CoreError::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Only lock contention is worth retrying verbatim. Conflicts need a
    /// different request (another seat, another flight).
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ConcurrencyBusy
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
