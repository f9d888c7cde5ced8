use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skyfare_core::FarePoint;
use crate::error::AppError;
use crate::flights::FlightResponse;
use crate::state::{to_amount, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pricing/{flight_no}", get(get_pricing))
        .route("/pricing", post(get_pricing_post))
        .route("/fare-history/{flight_no}", get(fare_history))
        .route("/fare-history", post(fare_history_post))
}

#[derive(Debug, Deserialize)]
pub struct PricingRequest {
    pub flight_no: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct FareHistoryRequest {
    pub flight_no: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FarePointResponse {
    pub timestamp: DateTime<Utc>,
    pub fare: f64,
}

impl From<FarePoint> for FarePointResponse {
    fn from(point: FarePoint) -> Self {
        Self {
            timestamp: point.timestamp,
            fare: to_amount(point.fare_cents),
        }
    }
}

/// GET /pricing/{flight_no}
/// Price the flight now and log the fare
pub async fn get_pricing(
    State(state): State<AppState>,
    Path(flight_no): Path<String>,
) -> Result<Json<FlightResponse>, AppError> {
    Ok(Json(state.fares.get_pricing(&flight_no).await?.into()))
}

/// POST /pricing
pub async fn get_pricing_post(
    State(state): State<AppState>,
    Json(req): Json<PricingRequest>,
) -> Result<Json<FlightResponse>, AppError> {
    Ok(Json(state.fares.get_pricing(&req.flight_no).await?.into()))
}

/// GET /fare-history/{flight_no}?limit=
pub async fn fare_history(
    State(state): State<AppState>,
    Path(flight_no): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<FarePointResponse>>, AppError> {
    history(&state, &flight_no, query.limit).await
}

/// POST /fare-history
pub async fn fare_history_post(
    State(state): State<AppState>,
    Json(req): Json<FareHistoryRequest>,
) -> Result<Json<Vec<FarePointResponse>>, AppError> {
    history(&state, &req.flight_no, req.limit).await
}

async fn history(state: &AppState, flight_no: &str, limit: Option<usize>) -> Result<Json<Vec<FarePointResponse>>, AppError> {
    let points = state.fares.fare_history(flight_no, limit).await?;
    Ok(Json(points.into_iter().map(FarePointResponse::from).collect()))
}
