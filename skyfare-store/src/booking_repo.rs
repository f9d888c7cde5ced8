use async_trait::async_trait;
use chrono::{DateTime, Utc};
use skyfare_core::repository::BookingRepository;
use skyfare_core::{Booking, CoreError, CoreResult};
use crate::database::db_error;
use crate::flight_repo::PgStore;

pub(crate) const BOOKING_COLUMNS: &str = "booking_id, pnr, trans_id, flight_id, flight_no, origin, destination, \
     passenger_name, passenger_contact, seat_no, status, price_cents, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct BookingRow {
    booking_id: i64,
    pnr: String,
    trans_id: String,
    flight_id: i64,
    flight_no: String,
    origin: String,
    destination: String,
    passenger_name: String,
    passenger_contact: String,
    seat_no: i32,
    status: String,
    price_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            booking_id: row.booking_id,
            pnr: row.pnr,
            trans_id: row.trans_id,
            flight_id: row.flight_id,
            flight_no: row.flight_no,
            origin: row.origin,
            destination: row.destination,
            passenger_name: row.passenger_name,
            passenger_contact: row.passenger_contact,
            seat_no: row.seat_no,
            status: row.status.parse()?,
            price_cents: row.price_cents,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) fn into_bookings(rows: Vec<BookingRow>) -> CoreResult<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

#[async_trait]
impl BookingRepository for PgStore {
    async fn list_bookings(&self) -> CoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings ORDER BY booking_id",
            BOOKING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        into_bookings(rows)
    }

    async fn get_booking(&self, pnr: &str) -> CoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE pnr = $1",
            BOOKING_COLUMNS
        ))
        .bind(pnr)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Booking::try_from).transpose()
    }

    async fn pnr_exists(&self, pnr: &str) -> CoreResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM bookings WHERE pnr = $1)")
            .bind(pnr)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn trans_id_exists(&self, trans_id: &str) -> CoreResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM bookings WHERE trans_id = $1)")
            .bind(trans_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }
}
