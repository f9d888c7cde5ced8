use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use skyfare_core::{CoreError, CoreResult, Flight, FlightTransaction, Store};

/// Seat-count bookkeeping for every flight.
///
/// The ledger is the only writer of `seats_available`. Every mutation runs
/// inside a per-flight [`FlightTransaction`], so the seat checks and the
/// decrement are serialized per flight and commit together with whatever
/// booking row the caller writes in the same unit of work.
pub struct InventoryLedger {
    store: Arc<dyn Store>,
    lock_wait: Duration,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn Store>, lock_wait: Duration) -> Self {
        Self { store, lock_wait }
    }

    pub fn lock_wait(&self) -> Duration {
        self.lock_wait
    }

    /// Lock a flight and open a unit of work on it.
    pub async fn open(&self, flight_id: i64) -> CoreResult<Box<dyn FlightTransaction>> {
        self.store.lock_flight(flight_id, self.lock_wait).await
    }

    /// Take `seat_no` out of the pool inside `tx`.
    ///
    /// Checks run in order: seat range, seat holder, availability. Nothing is
    /// staged unless all of them pass.
    pub async fn reserve_seat(tx: &mut dyn FlightTransaction, seat_no: i32) -> CoreResult<()> {
        let flight = tx.flight().clone();
        validate_seat(&flight, seat_no)?;

        if let Some(holder) = tx.seat_holder(seat_no).await? {
            debug!(flight_no = %flight.flight_no, seat_no, pnr = %holder.pnr, "seat already held");
            return Err(CoreError::SeatTaken {
                flight_no: flight.flight_no,
                seat_no,
            });
        }

        if flight.seats_available <= 0 {
            return Err(CoreError::SoldOut(flight.flight_no));
        }

        tx.set_seats_available(flight.seats_available - 1).await
    }

    /// Give one seat back inside `tx`, never exceeding capacity.
    pub async fn release_seat(tx: &mut dyn FlightTransaction) -> CoreResult<i32> {
        let flight = tx.flight();
        let released = (flight.seats_available + 1).min(flight.total_seats);
        tx.set_seats_available(released).await?;
        Ok(released)
    }

    /// Shift availability by `delta` inside `tx`, clamped to `0..=total_seats`.
    pub async fn shift_seats(tx: &mut dyn FlightTransaction, delta: i32) -> CoreResult<i32> {
        let flight = tx.flight();
        let shifted = clamp_availability(flight.seats_available.saturating_add(delta), flight.total_seats);
        tx.set_seats_available(shifted).await?;
        Ok(shifted)
    }

    /// Release one seat of `flight_id` in its own unit of work.
    pub async fn release(&self, flight_id: i64) -> CoreResult<Flight> {
        let mut tx = self.open(flight_id).await?;
        Self::release_seat(tx.as_mut()).await?;
        let flight = tx.flight().clone();
        tx.commit().await?;
        Ok(flight)
    }

    /// Random-walk step used by the market simulator.
    pub async fn perturb(&self, flight_id: i64, delta: i32) -> CoreResult<Flight> {
        let mut tx = self.open(flight_id).await?;
        let before = tx.flight().seats_available;
        let after = Self::shift_seats(tx.as_mut(), delta).await?;
        let flight = tx.flight().clone();
        tx.commit().await?;

        info!(flight_no = %flight.flight_no, delta, before, after, "availability perturbed");
        Ok(flight)
    }
}

pub fn validate_seat(flight: &Flight, seat_no: i32) -> CoreResult<()> {
    if seat_no < 1 || seat_no > flight.total_seats {
        return Err(CoreError::InvalidSeat {
            seat_no,
            total_seats: flight.total_seats,
        });
    }
    Ok(())
}

pub fn clamp_availability(seats_available: i32, total_seats: i32) -> i32 {
    seats_available.clamp(0, total_seats.max(0))
}
