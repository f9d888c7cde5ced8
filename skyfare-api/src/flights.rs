use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use skyfare_booking::FlightView;
use skyfare_catalog::ExternalSchedule;
use skyfare_core::search::FlightSearch;
use skyfare_core::NewFlight;
use crate::error::AppError;
use crate::state::{to_amount, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/flights", get(list_flights).post(create_flight))
        .route("/flights/list", post(list_flights))
        .route("/flights/search", get(search_flights_get).post(search_flights_post))
        .route("/external/airline-schedule", get(external_schedule_get).post(external_schedule_post))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FlightResponse {
    pub flight_id: i64,
    pub flight_no: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub base_fare: f64,
    pub total_seats: i32,
    pub seats_available: i32,
    pub airline_name: String,
    pub dynamic_price: f64,
    pub duration_seconds: i64,
}

impl From<FlightView> for FlightResponse {
    fn from(view: FlightView) -> Self {
        let flight = view.flight;
        Self {
            flight_id: flight.flight_id,
            flight_no: flight.flight_no,
            origin: flight.origin,
            destination: flight.destination,
            departure: flight.departure,
            arrival: flight.arrival,
            base_fare: to_amount(flight.base_fare_cents),
            total_seats: flight.total_seats,
            seats_available: flight.seats_available,
            airline_name: flight.airline_name,
            dynamic_price: to_amount(view.dynamic_price_cents),
            duration_seconds: view.duration_seconds,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFlightRequest {
    pub flight_no: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub base_fare: f64,
    pub total_seats: i32,
    /// Defaults to `total_seats`
    pub seats_available: Option<i32>,
    pub airline_name: String,
}

impl CreateFlightRequest {
    fn into_new_flight(self) -> Result<NewFlight, AppError> {
        if !self.base_fare.is_finite() || self.base_fare < 0.0 {
            return Err(AppError::ValidationError("base_fare must be a non-negative amount".to_string()));
        }
        Ok(NewFlight {
            flight_no: self.flight_no.trim().to_string(),
            origin: self.origin,
            destination: self.destination,
            departure: self.departure,
            arrival: self.arrival,
            base_fare_cents: (self.base_fare * 100.0).round() as i64,
            total_seats: self.total_seats,
            seats_available: self.seats_available.unwrap_or(self.total_seats),
            airline_name: self.airline_name,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    pub origin: String,
    pub destination: String,
    pub airline_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExternalFlightResponse {
    pub external_flight_no: String,
    pub origin: String,
    pub destination: String,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub available_seats: i32,
    pub price: f64,
    pub airline_name: String,
}

#[derive(Debug, Serialize)]
pub struct ExternalScheduleResponse {
    pub provider: String,
    pub results: Vec<ExternalFlightResponse>,
}

impl From<ExternalSchedule> for ExternalScheduleResponse {
    fn from(schedule: ExternalSchedule) -> Self {
        Self {
            provider: schedule.provider,
            results: schedule
                .results
                .into_iter()
                .map(|f| ExternalFlightResponse {
                    external_flight_no: f.external_flight_no,
                    origin: f.origin,
                    destination: f.destination,
                    departure: f.departure,
                    arrival: f.arrival,
                    available_seats: f.available_seats,
                    price: to_amount(f.price_cents),
                    airline_name: f.airline_name,
                })
                .collect(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /flights, POST /flights/list
pub async fn list_flights(State(state): State<AppState>) -> Result<Json<Vec<FlightResponse>>, AppError> {
    let flights = state.fares.list_flights().await?;
    Ok(Json(flights.into_iter().map(FlightResponse::from).collect()))
}

/// POST /flights
pub async fn create_flight(
    State(state): State<AppState>,
    Json(req): Json<CreateFlightRequest>,
) -> Result<(StatusCode, Json<FlightResponse>), AppError> {
    let view = state.fares.create_flight(req.into_new_flight()?).await?;
    info!("Flight {} added to schedule", view.flight.flight_no);
    Ok((StatusCode::CREATED, Json(view.into())))
}

/// GET /flights/search?origin=&destination=&date=&sort_by=
pub async fn search_flights_get(
    State(state): State<AppState>,
    Query(search): Query<FlightSearch>,
) -> Result<Json<Vec<FlightResponse>>, AppError> {
    search_flights(&state, &search).await
}

/// POST /flights/search
pub async fn search_flights_post(
    State(state): State<AppState>,
    Json(search): Json<FlightSearch>,
) -> Result<Json<Vec<FlightResponse>>, AppError> {
    search_flights(&state, &search).await
}

async fn search_flights(state: &AppState, search: &FlightSearch) -> Result<Json<Vec<FlightResponse>>, AppError> {
    let flights = state.fares.search_flights(search).await?;
    Ok(Json(flights.into_iter().map(FlightResponse::from).collect()))
}

/// GET /external/airline-schedule?origin=&destination=
pub async fn external_schedule_get(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> Json<ExternalScheduleResponse> {
    external_schedule(&state, query)
}

/// POST /external/airline-schedule
pub async fn external_schedule_post(
    State(state): State<AppState>,
    Json(query): Json<ScheduleQuery>,
) -> Json<ExternalScheduleResponse> {
    external_schedule(&state, query)
}

fn external_schedule(state: &AppState, query: ScheduleQuery) -> Json<ExternalScheduleResponse> {
    let schedule = state
        .schedule
        .schedule(&query.origin, &query.destination, query.airline_name.as_deref(), Utc::now());
    Json(schedule.into())
}
