//! Row-lock behaviour of [`PgStore`] against a live Postgres.
//!
//! Ignored by default. Point `DATABASE_URL` at a scratch database and run:
//! ```bash
//! DATABASE_URL=postgres://localhost/skyfare_test cargo test -p skyfare-store --test pg_ledger -- --ignored
//! ```
//! Each test creates its own flight, so runs can share one database.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use skyfare_core::{BookingRepository, BookingStatus, CoreError, Flight, FlightLocks, FlightRepository, NewBooking, NewFlight};
use skyfare_store::app_config::DatabaseConfig;
use skyfare_store::{DbClient, PgStore};

async fn connect() -> Option<PgStore> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let client = DbClient::new(&DatabaseConfig {
        url,
        max_connections: 12,
        acquire_timeout_ms: 5_000,
    })
    .await
    .expect("connect to DATABASE_URL");
    client.migrate().await.expect("run migrations");
    Some(PgStore::new(client.pool))
}

fn run_id() -> i64 {
    Utc::now().timestamp_micros()
}

async fn create_flight(store: &PgStore, prefix: char, seats: i32) -> Flight {
    let departure = Utc::now() + ChronoDuration::days(10);
    store
        .create_flight(&NewFlight {
            flight_no: format!("{}{:09}", prefix, run_id() % 1_000_000_000),
            origin: "Delhi".to_string(),
            destination: "Mumbai".to_string(),
            departure,
            arrival: departure + ChronoDuration::hours(2),
            base_fare_cents: 500_000,
            total_seats: seats,
            seats_available: seats,
            airline_name: "Air India".to_string(),
        })
        .await
        .expect("create flight")
}

/// Six base-36 characters, unique enough across runs.
fn pnr(seed: i64) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut n = seed.rem_euclid(36_i64.pow(6));
    let mut out = [b'A'; 6];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(n % 36) as usize];
        n /= 36;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn booking(flight: &Flight, pnr: String, seat_no: i32) -> NewBooking {
    NewBooking {
        trans_id: format!("{}-{}", flight.flight_no, pnr),
        pnr,
        flight_id: flight.flight_id,
        flight_no: flight.flight_no.clone(),
        origin: flight.origin.clone(),
        destination: flight.destination.clone(),
        passenger_name: "Meera Iyer".to_string(),
        passenger_contact: "meera@example.com".to_string(),
        seat_no,
        status: BookingStatus::Reserved,
        price_cents: 535_000,
        created_at: Utc::now(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_single_seat_race_has_one_winner() {
    let Some(store) = connect().await else { return };
    let store = Arc::new(store);
    let flight = create_flight(&store, 'R', 5).await;
    let base = run_id() * 16;

    let mut handles = Vec::new();
    for i in 0..8_i64 {
        let store = store.clone();
        let flight = flight.clone();
        handles.push(tokio::spawn(async move {
            let mut tx = store.lock_flight(flight.flight_id, Duration::from_secs(5)).await?;
            if tx.seat_holder(1).await?.is_some() {
                return Ok::<bool, CoreError>(false);
            }
            let remaining = tx.flight().seats_available - 1;
            tx.set_seats_available(remaining).await?;
            tx.insert_booking(booking(&flight, pnr(base + i), 1)).await?;
            tx.commit().await?;
            Ok(true)
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    let after = store.get_flight(flight.flight_id).await.unwrap().unwrap();
    assert_eq!(after.seats_available, 4);

    let holders = store
        .list_bookings()
        .await
        .unwrap()
        .into_iter()
        .filter(|b| b.flight_id == flight.flight_id && b.status.holds_seat())
        .count();
    assert_eq!(holders, 1);
}

#[tokio::test]
#[ignore]
async fn test_lock_wait_times_out_as_busy() {
    let Some(store) = connect().await else { return };
    let flight = create_flight(&store, 'B', 10).await;

    let held = store.lock_flight(flight.flight_id, Duration::from_secs(1)).await.unwrap();
    let err = store
        .lock_flight(flight.flight_id, Duration::from_millis(100))
        .await
        .err()
        .expect("second lock must time out");
    assert!(matches!(err, CoreError::Busy(_)));
    assert!(err.is_retryable());

    held.commit().await.unwrap();
    assert!(store.lock_flight(flight.flight_id, Duration::from_secs(1)).await.is_ok());
}

#[tokio::test]
#[ignore]
async fn test_dropped_unit_of_work_rolls_back() {
    let Some(store) = connect().await else { return };
    let flight = create_flight(&store, 'D', 10).await;
    let code = pnr(run_id() * 16 + 1);

    {
        let mut tx = store.lock_flight(flight.flight_id, Duration::from_secs(1)).await.unwrap();
        tx.set_seats_available(3).await.unwrap();
        tx.insert_booking(booking(&flight, code.clone(), 2)).await.unwrap();
    }

    let after = store.get_flight(flight.flight_id).await.unwrap().unwrap();
    assert_eq!(after.seats_available, 10);
    assert!(store.get_booking(&code).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_unique_violations_surface_as_domain_errors() {
    let Some(store) = connect().await else { return };
    let flight = create_flight(&store, 'U', 10).await;

    let dup = NewFlight {
        flight_no: flight.flight_no.clone(),
        origin: flight.origin.clone(),
        destination: flight.destination.clone(),
        departure: flight.departure,
        arrival: flight.arrival,
        base_fare_cents: 1,
        total_seats: 1,
        seats_available: 1,
        airline_name: "X".to_string(),
    };
    assert!(matches!(store.create_flight(&dup).await, Err(CoreError::DuplicateFlight(_))));

    let code = pnr(run_id() * 16 + 2);
    let mut tx = store.lock_flight(flight.flight_id, Duration::from_secs(1)).await.unwrap();
    tx.insert_booking(booking(&flight, code.clone(), 1)).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.lock_flight(flight.flight_id, Duration::from_secs(1)).await.unwrap();
    let mut again = booking(&flight, code, 2);
    again.trans_id.push_str("-retry");
    let err = tx.insert_booking(again).await.unwrap_err();
    assert!(matches!(err, CoreError::IdentifierCollision(_)));
}
