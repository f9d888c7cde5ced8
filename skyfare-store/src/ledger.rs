use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Postgres, Transaction};
use std::time::Duration;
use tracing::debug;
use skyfare_core::repository::{FlightLocks, FlightTransaction};
use skyfare_core::{Booking, BookingStatus, CoreError, CoreResult, Flight, NewBooking};
use crate::booking_repo::{BookingRow, BOOKING_COLUMNS};
use crate::database::db_error;
use crate::flight_repo::{FlightRow, PgStore, FLIGHT_COLUMNS};

#[async_trait]
impl FlightLocks for PgStore {
    async fn lock_flight(&self, flight_id: i64, wait: Duration) -> CoreResult<Box<dyn FlightTransaction>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // lock_timeout does not take bind parameters
        let timeout_ms = wait.as_millis().max(1);
        sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", timeout_ms))
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let row = sqlx::query_as::<_, FlightRow>(&format!(
            "SELECT {} FROM flights WHERE flight_id = $1 FOR UPDATE",
            FLIGHT_COLUMNS
        ))
        .bind(flight_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| match db_error(e) {
            CoreError::Busy(_) => CoreError::Busy(format!("flight {} is locked by another operation", flight_id)),
            other => other,
        })?;

        let flight: Flight = row
            .ok_or_else(|| CoreError::FlightNotFound(flight_id.to_string()))?
            .into();

        debug!(flight_id, "flight row locked");
        Ok(Box::new(PgFlightTransaction { tx, flight }))
    }
}

/// Row-locked unit of work. Writes go straight into the open database
/// transaction; dropping it without `commit` rolls them back.
struct PgFlightTransaction {
    tx: Transaction<'static, Postgres>,
    flight: Flight,
}

impl PgFlightTransaction {
    async fn fetch_booking(&mut self, filter: &str, value: &str) -> CoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE flight_id = $1 AND {} = $2",
            BOOKING_COLUMNS, filter
        ))
        .bind(self.flight.flight_id)
        .bind(value)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)?;

        row.map(Booking::try_from).transpose()
    }
}

#[async_trait]
impl FlightTransaction for PgFlightTransaction {
    fn flight(&self) -> &Flight {
        &self.flight
    }

    async fn set_seats_available(&mut self, seats_available: i32) -> CoreResult<()> {
        if seats_available < 0 || seats_available > self.flight.total_seats {
            return Err(CoreError::InternalError(format!(
                "seats_available {} out of bounds for flight {}",
                seats_available, self.flight.flight_no
            )));
        }

        sqlx::query("UPDATE flights SET seats_available = $1 WHERE flight_id = $2")
            .bind(seats_available)
            .bind(self.flight.flight_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error)?;

        self.flight.seats_available = seats_available;
        Ok(())
    }

    async fn seat_holder(&mut self, seat_no: i32) -> CoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE flight_id = $1 AND seat_no = $2 AND status IN ('Reserved', 'Confirmed')",
            BOOKING_COLUMNS
        ))
        .bind(self.flight.flight_id)
        .bind(seat_no)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)?;

        row.map(Booking::try_from).transpose()
    }

    async fn find_booking(&mut self, pnr: &str) -> CoreResult<Option<Booking>> {
        self.fetch_booking("pnr", pnr).await
    }

    async fn insert_booking(&mut self, booking: NewBooking) -> CoreResult<Booking> {
        if booking.flight_id != self.flight.flight_id {
            return Err(CoreError::InternalError(format!(
                "booking for flight {} written through lock on flight {}",
                booking.flight_id, self.flight.flight_id
            )));
        }

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (pnr, trans_id, flight_id, flight_no, origin, destination, passenger_name,
                                  passenger_contact, seat_no, status, price_cents, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(&booking.pnr)
        .bind(&booking.trans_id)
        .bind(booking.flight_id)
        .bind(&booking.flight_no)
        .bind(&booking.origin)
        .bind(&booking.destination)
        .bind(&booking.passenger_name)
        .bind(&booking.passenger_contact)
        .bind(booking.seat_no)
        .bind(booking.status.as_str())
        .bind(booking.price_cents)
        .bind(booking.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_error)?;

        row.try_into()
    }

    async fn update_booking_status(&mut self, booking_id: i64, status: BookingStatus) -> CoreResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "UPDATE bookings SET status = $1, updated_at = $2 WHERE booking_id = $3 AND flight_id = $4 RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(booking_id)
        .bind(self.flight.flight_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_error)?;

        row.ok_or_else(|| CoreError::BookingNotFound(booking_id.to_string()))?
            .try_into()
    }

    async fn commit(self: Box<Self>) -> CoreResult<()> {
        self.tx.commit().await.map_err(db_error)
    }
}
