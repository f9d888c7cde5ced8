use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use skyfare_api::{app, AppState};
use skyfare_booking::FixedPaymentAdapter;
use skyfare_catalog::{FixedDemand, PricingConfig, PricingEngine};
use skyfare_core::payment::PaymentStatus;
use skyfare_store::app_config::BookingRules;
use skyfare_store::InMemoryStore;

async fn test_app(outcome: PaymentStatus) -> Router {
    let store = Arc::new(InMemoryStore::new());
    let pricing = Arc::new(PricingEngine::new(PricingConfig::default(), Box::new(FixedDemand(0.0))));
    let rules = BookingRules {
        lock_wait_ms: 500,
        payment_success_rate: 1.0,
        max_identifier_attempts: 5,
    };
    let state = AppState::new(store, pricing, Arc::new(FixedPaymentAdapter(outcome)), &rules);
    state.fares.seed_sample_flights(Utc::now()).await.unwrap();
    state.fares.seed_initial_fares(Utc::now()).await.unwrap();
    app(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn reserve_body(flight_id: i64, seat_no: i32) -> Value {
    json!({
        "flight_id": flight_id,
        "seat_no": seat_no,
        "passenger_name": "Kabir Singh",
        "passenger_contact": "kabir@example.com"
    })
}

#[tokio::test]
async fn root_answers_get_and_post() {
    let app = test_app(PaymentStatus::Succeeded).await;
    for method in ["GET", "POST"] {
        let (status, body) = send(&app, method, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Flight Booking API running");
    }
}

#[tokio::test]
async fn flights_are_listed_with_dynamic_price() {
    let app = test_app(PaymentStatus::Succeeded).await;

    let (status, body) = send(&app, "GET", "/flights", None).await;
    assert_eq!(status, StatusCode::OK);
    let flights = body.as_array().unwrap();
    assert_eq!(flights.len(), 3);
    assert_eq!(flights[0]["flight_no"], "AI101");
    assert_eq!(flights[0]["base_fare"], 5000.0);
    assert!(flights[0]["dynamic_price"].as_f64().unwrap() >= 50.0);
    assert_eq!(flights[0]["duration_seconds"], 7200);

    let (status, body) = send(&app, "POST", "/flights/list", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn search_filters_and_sorts() {
    let app = test_app(PaymentStatus::Succeeded).await;

    let (status, body) = send(&app, "GET", "/flights/search?origin=delhi&destination=mumbai", None).await;
    assert_eq!(status, StatusCode::OK);
    let flights = body.as_array().unwrap();
    assert_eq!(flights.len(), 1);
    assert_eq!(flights[0]["flight_no"], "AI101");

    let (status, body) = send(&app, "POST", "/flights/search", Some(json!({ "sort_by": "duration" }))).await;
    assert_eq!(status, StatusCode::OK);
    let order: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["flight_no"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["AI102", "AI101", "AI103"]);
}

#[tokio::test]
async fn create_flight_and_reject_duplicate() {
    let app = test_app(PaymentStatus::Succeeded).await;
    let departure = Utc::now() + chrono::Duration::days(5);
    let flight = json!({
        "flight_no": "6E501",
        "origin": "Pune",
        "destination": "Goa",
        "departure": departure,
        "arrival": departure + chrono::Duration::minutes(65),
        "base_fare": 3200.0,
        "total_seats": 180,
        "airline_name": "IndiGo"
    });

    let (status, body) = send(&app, "POST", "/flights", Some(flight.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["seats_available"], 180);
    assert_eq!(body["duration_seconds"], 3900);

    let (status, body) = send(&app, "GET", "/fare-history/6E501", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "POST", "/flights", Some(flight)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("6E501"));
}

#[tokio::test]
async fn booking_round_trip() {
    let app = test_app(PaymentStatus::Succeeded).await;

    let (status, reserved) = send(&app, "POST", "/bookings", Some(reserve_body(1, 12))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reserved["status"], "Reserved");
    assert_eq!(reserved["message"], "Seat reserved successfully");
    let pnr = reserved["pnr"].as_str().unwrap().to_string();

    let (status, taken) = send(&app, "POST", "/bookings", Some(reserve_body(1, 12))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(taken["error"].is_string());

    let (status, paid) = send(&app, "POST", &format!("/bookings/{}/pay", pnr), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "Confirmed");
    assert_eq!(paid["pnr"], pnr.as_str());

    let (status, booking) = send(&app, "GET", &format!("/bookings/{}", pnr), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["seat_no"], 12);
    assert_eq!(booking["origin"], "Delhi");
    assert_eq!(booking["price"], reserved["price"]);

    let (status, cancelled) = send(&app, "POST", &format!("/bookings/{}/cancel", pnr), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "Cancelled");
    assert_eq!(cancelled["flight_id"], 1);

    let (status, again) = send(&app, "POST", &format!("/bookings/{}/cancel", pnr), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["status"], "Cancelled");

    let (status, body) = send(&app, "POST", &format!("/bookings/{}/confirm", pnr), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());

    let (_, list) = send(&app, "GET", "/bookings", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_payment_reports_payment_failed() {
    let app = test_app(PaymentStatus::Failed).await;

    let (_, reserved) = send(&app, "POST", "/bookings", Some(reserve_body(2, 1))).await;
    let pnr = reserved["pnr"].as_str().unwrap().to_string();

    let (status, paid) = send(&app, "POST", &format!("/bookings/{}/pay", pnr), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "Payment Failed");

    let (_, flights) = send(&app, "GET", "/flights", None).await;
    assert_eq!(flights[1]["seats_available"], 120);

    let (status, _) = send(&app, "POST", "/bookings", Some(reserve_body(2, 1))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let app = test_app(PaymentStatus::Succeeded).await;

    let (status, body) = send(&app, "POST", "/bookings", Some(reserve_body(1, 0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("seat"));

    let (status, _) = send(&app, "POST", "/bookings", Some(reserve_body(42, 1))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/bookings/NOPE00", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/pricing/ZZ999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn client_trans_id_is_kept_and_unique() {
    let app = test_app(PaymentStatus::Succeeded).await;

    let mut body = reserve_body(3, 4);
    body["trans_id"] = json!("client-tx-001");
    let (status, reserved) = send(&app, "POST", "/bookings", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reserved["trans_id"], "client-tx-001");

    body["seat_no"] = json!(5);
    let (status, _) = send(&app, "POST", "/bookings", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut missing_name = reserve_body(3, 6);
    missing_name.as_object_mut().unwrap().remove("passenger_name");
    let (status, _) = send(&app, "POST", "/bookings", Some(missing_name)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn pricing_queries_extend_fare_history() {
    let app = test_app(PaymentStatus::Succeeded).await;

    for _ in 0..6 {
        let (status, body) = send(&app, "GET", "/pricing/AI101", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["flight_no"], "AI101");
    }
    let (status, _) = send(&app, "POST", "/pricing", Some(json!({ "flight_no": "AI101" }))).await;
    assert_eq!(status, StatusCode::OK);

    // one seeded fare plus seven pricing queries
    let (_, history) = send(&app, "GET", "/fare-history/AI101", None).await;
    assert_eq!(history.as_array().unwrap().len(), 8);

    let (_, limited) = send(&app, "GET", "/fare-history/AI101?limit=5", None).await;
    let points = limited.as_array().unwrap();
    assert_eq!(points.len(), 5);
    let stamps: Vec<&str> = points.iter().map(|p| p["timestamp"].as_str().unwrap()).collect();
    let parsed: Vec<chrono::DateTime<Utc>> = stamps.iter().map(|s| s.parse().unwrap()).collect();
    assert!(parsed.windows(2).all(|w| w[0] >= w[1]));

    let (_, posted) = send(&app, "POST", "/fare-history", Some(json!({ "flight_no": "AI101", "limit": 3 }))).await;
    assert_eq!(posted.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn external_schedule_mock() {
    let app = test_app(PaymentStatus::Succeeded).await;

    let (status, body) = send(&app, "GET", "/external/airline-schedule?origin=Delhi&destination=Goa", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider"], "mock-airline");
    assert_eq!(body["results"].as_array().unwrap().len(), 3);

    let (status, body) = send(
        &app,
        "POST",
        "/external/airline-schedule",
        Some(json!({ "origin": "Delhi", "destination": "Goa", "airline_name": "Vistara" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["results"]
        .as_array()
        .unwrap()
        .iter()
        .all(|r| r["airline_name"] == "Vistara"));
}
