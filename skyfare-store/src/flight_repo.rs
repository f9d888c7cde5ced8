use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use skyfare_core::repository::FlightRepository;
use skyfare_core::search::FlightSearch;
use skyfare_core::{CoreError, CoreResult, Flight, NewFlight};
use crate::database::db_error;

pub(crate) const FLIGHT_COLUMNS: &str = "flight_id, flight_no, origin, destination, departure, arrival, \
     base_fare_cents, total_seats, seats_available, airline_name";

/// Postgres-backed store. Implements every repository trait plus the
/// per-flight row locks (see `ledger.rs`).
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct FlightRow {
    flight_id: i64,
    flight_no: String,
    origin: String,
    destination: String,
    departure: DateTime<Utc>,
    arrival: DateTime<Utc>,
    base_fare_cents: i64,
    total_seats: i32,
    seats_available: i32,
    airline_name: String,
}

impl From<FlightRow> for Flight {
    fn from(row: FlightRow) -> Self {
        Flight {
            flight_id: row.flight_id,
            flight_no: row.flight_no,
            origin: row.origin,
            destination: row.destination,
            departure: row.departure,
            arrival: row.arrival,
            base_fare_cents: row.base_fare_cents,
            total_seats: row.total_seats,
            seats_available: row.seats_available,
            airline_name: row.airline_name,
        }
    }
}

#[async_trait]
impl FlightRepository for PgStore {
    async fn list_flights(&self) -> CoreResult<Vec<Flight>> {
        let rows = sqlx::query_as::<_, FlightRow>(&format!(
            "SELECT {} FROM flights ORDER BY flight_id",
            FLIGHT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Flight::from).collect())
    }

    async fn get_flight(&self, flight_id: i64) -> CoreResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(&format!(
            "SELECT {} FROM flights WHERE flight_id = $1",
            FLIGHT_COLUMNS
        ))
        .bind(flight_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Flight::from))
    }

    async fn get_flight_by_no(&self, flight_no: &str) -> CoreResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(&format!(
            "SELECT {} FROM flights WHERE flight_no = $1",
            FLIGHT_COLUMNS
        ))
        .bind(flight_no)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Flight::from))
    }

    async fn search_flights(&self, search: &FlightSearch) -> CoreResult<Vec<Flight>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM flights WHERE TRUE", FLIGHT_COLUMNS));

        if let Some(origin) = &search.origin {
            query.push(" AND lower(origin) = lower(").push_bind(origin.clone()).push(")");
        }
        if let Some(destination) = &search.destination {
            query.push(" AND lower(destination) = lower(").push_bind(destination.clone()).push(")");
        }
        if let Some(date) = search.date {
            let start = date
                .and_hms_opt(0, 0, 0)
                .map(|d| d.and_utc())
                .ok_or_else(|| CoreError::ValidationError(format!("invalid date {}", date)))?;
            query
                .push(" AND departure >= ")
                .push_bind(start)
                .push(" AND departure < ")
                .push_bind(start + Duration::days(1));
        }
        query.push(" ORDER BY flight_id");

        let rows = query
            .build_query_as::<FlightRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(Flight::from).collect())
    }

    async fn create_flight(&self, flight: &NewFlight) -> CoreResult<Flight> {
        let row = sqlx::query_as::<_, FlightRow>(&format!(
            r#"
            INSERT INTO flights (flight_no, origin, destination, departure, arrival, base_fare_cents, total_seats, seats_available, airline_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            FLIGHT_COLUMNS
        ))
        .bind(&flight.flight_no)
        .bind(&flight.origin)
        .bind(&flight.destination)
        .bind(flight.departure)
        .bind(flight.arrival)
        .bind(flight.base_fare_cents)
        .bind(flight.total_seats)
        .bind(flight.seats_available)
        .bind(&flight.airline_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match db_error(e) {
            CoreError::DuplicateFlight(_) => CoreError::DuplicateFlight(flight.flight_no.clone()),
            other => other,
        })?;

        Ok(row.into())
    }
}
