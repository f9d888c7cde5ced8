use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use skyfare_booking::{
    CancellationReceipt, ConfirmationReceipt, PaymentReceipt, ReservationReceipt, ReservationRequest,
};
use skyfare_core::{Booking, BookingStatus};
use crate::error::AppError;
use crate::state::{to_amount, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_bookings).post(reserve_booking))
        .route("/bookings/list", post(list_bookings))
        .route("/bookings/{pnr}", get(get_booking))
        .route("/bookings/{pnr}/pay", post(pay_booking))
        .route("/bookings/{pnr}/confirm", post(confirm_booking))
        .route("/bookings/{pnr}/cancel", post(cancel_booking))
}

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    pub pnr: String,
    pub trans_id: String,
    pub flight_id: i64,
    pub flight_no: String,
    pub seat_no: i32,
    pub status: BookingStatus,
    pub price: f64,
    pub message: String,
}

impl From<ReservationReceipt> for ReservationResponse {
    fn from(receipt: ReservationReceipt) -> Self {
        Self {
            pnr: receipt.pnr,
            trans_id: receipt.trans_id,
            flight_id: receipt.flight_id,
            flight_no: receipt.flight_no,
            seat_no: receipt.seat_no,
            status: receipt.status,
            price: to_amount(receipt.price_cents),
            message: receipt.message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
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
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            booking_id: b.booking_id,
            pnr: b.pnr,
            trans_id: b.trans_id,
            flight_id: b.flight_id,
            flight_no: b.flight_no,
            origin: b.origin,
            destination: b.destination,
            passenger_name: b.passenger_name,
            passenger_contact: b.passenger_contact,
            seat_no: b.seat_no,
            status: b.status,
            price: to_amount(b.price_cents),
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

/// POST /bookings
pub async fn reserve_booking(
    State(state): State<AppState>,
    Json(req): Json<ReservationRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), AppError> {
    let receipt = state.bookings.reserve(req).await?;

    Ok((StatusCode::CREATED, Json(receipt.into())))
}

/// GET /bookings, POST /bookings/list
pub async fn list_bookings(State(state): State<AppState>) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = state.bookings.list_bookings().await?;
    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

/// GET /bookings/{pnr}
pub async fn get_booking(
    State(state): State<AppState>,
    Path(pnr): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    Ok(Json(state.bookings.get_booking(&pnr).await?.into()))
}

/// POST /bookings/{pnr}/pay
/// Run the simulated payment for a reserved booking
pub async fn pay_booking(
    State(state): State<AppState>,
    Path(pnr): Path<String>,
) -> Result<Json<PaymentReceipt>, AppError> {
    Ok(Json(state.bookings.simulate_payment(&pnr).await?))
}

/// POST /bookings/{pnr}/confirm
pub async fn confirm_booking(
    State(state): State<AppState>,
    Path(pnr): Path<String>,
) -> Result<Json<ConfirmationReceipt>, AppError> {
    Ok(Json(state.bookings.confirm(&pnr).await?))
}

/// POST /bookings/{pnr}/cancel
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(pnr): Path<String>,
) -> Result<Json<CancellationReceipt>, AppError> {
    Ok(Json(state.bookings.cancel(&pnr).await?))
}
