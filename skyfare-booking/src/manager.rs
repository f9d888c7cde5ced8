use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use skyfare_catalog::{InventoryLedger, PricingEngine};
use skyfare_core::payment::PaymentStatus;
use skyfare_core::{Booking, BookingStatus, CoreError, CoreResult, NewBooking, Store};
use crate::orchestrator::PaymentOrchestrator;
use crate::pnr::{IdSource, RandomIds};

pub const DEFAULT_IDENTIFIER_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    pub flight_id: i64,
    pub seat_no: i32,
    pub passenger_name: String,
    pub passenger_contact: String,
    /// Caller-supplied transaction token; generated when absent.
    #[serde(default)]
    pub trans_id: Option<String>,
}

impl ReservationRequest {
    fn validate(&self) -> CoreResult<()> {
        if self.passenger_name.trim().is_empty() {
            return Err(CoreError::ValidationError("passenger_name must not be empty".to_string()));
        }
        if self.passenger_contact.trim().is_empty() {
            return Err(CoreError::ValidationError("passenger_contact must not be empty".to_string()));
        }
        if matches!(&self.trans_id, Some(t) if t.trim().is_empty()) {
            return Err(CoreError::ValidationError("trans_id must not be blank".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationReceipt {
    pub pnr: String,
    pub trans_id: String,
    pub flight_id: i64,
    pub flight_no: String,
    pub seat_no: i32,
    pub status: BookingStatus,
    pub price_cents: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub pnr: String,
    pub status: BookingStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationReceipt {
    pub pnr: String,
    pub status: BookingStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationReceipt {
    pub pnr: String,
    pub flight_id: i64,
    pub status: BookingStatus,
    pub message: String,
}

/// PNRs with a gateway call in flight. At most one charge per booking runs
/// at a time.
#[derive(Default)]
struct PaymentClaims {
    pnrs: Mutex<HashSet<String>>,
}

impl PaymentClaims {
    fn claim(&self, pnr: &str) -> Option<PaymentClaim<'_>> {
        let mut pnrs = self.pnrs.lock().unwrap_or_else(|e| e.into_inner());
        if !pnrs.insert(pnr.to_string()) {
            return None;
        }
        Some(PaymentClaim {
            claims: self,
            pnr: pnr.to_string(),
        })
    }
}

/// Released on drop, after the outcome is committed or abandoned.
struct PaymentClaim<'a> {
    claims: &'a PaymentClaims,
    pnr: String,
}

impl Drop for PaymentClaim<'_> {
    fn drop(&mut self) {
        let mut pnrs = self.claims.pnrs.lock().unwrap_or_else(|e| e.into_inner());
        pnrs.remove(&self.pnr);
    }
}

/// Owns the booking lifecycle:
///
/// ```text
/// Reserved ──pay ok / confirm──▶ Confirmed
///    │  └──────pay failed──────▶ Payment Failed   (seat released)
///    └──────────cancel─────────▶ Cancelled        (from Reserved, Confirmed, Payment Failed)
/// ```
///
/// Every status change runs in a unit of work on the booking's flight, so the
/// seat count and the booking row always move together.
pub struct BookingManager {
    store: Arc<dyn Store>,
    ledger: InventoryLedger,
    pricing: Arc<PricingEngine>,
    payments: PaymentOrchestrator,
    ids: Arc<dyn IdSource>,
    max_identifier_attempts: u32,
    payment_claims: PaymentClaims,
}

impl BookingManager {
    pub fn new(
        store: Arc<dyn Store>,
        pricing: Arc<PricingEngine>,
        payments: PaymentOrchestrator,
        lock_wait: Duration,
    ) -> Self {
        Self {
            ledger: InventoryLedger::new(store.clone(), lock_wait),
            store,
            pricing,
            payments,
            ids: Arc::new(RandomIds::from_entropy()),
            max_identifier_attempts: DEFAULT_IDENTIFIER_ATTEMPTS,
            payment_claims: PaymentClaims::default(),
        }
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdSource>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_max_identifier_attempts(mut self, attempts: u32) -> Self {
        self.max_identifier_attempts = attempts.max(1);
        self
    }

    /// Reserve a seat: Reserved booking, seat taken out of the pool, fare snapshot stored.
    pub async fn reserve(&self, request: ReservationRequest) -> CoreResult<ReservationReceipt> {
        request.validate()?;

        if let Some(trans_id) = &request.trans_id {
            if self.store.trans_id_exists(trans_id).await? {
                return Err(CoreError::DuplicateTransaction(trans_id.clone()));
            }
        }

        for attempt in 1..=self.max_identifier_attempts {
            let pnr = self.issue_pnr().await?;
            let trans_id = match &request.trans_id {
                Some(trans_id) => trans_id.clone(),
                None => self.issue_trans_id().await?,
            };

            match self.try_reserve(&request, pnr, trans_id).await {
                Err(CoreError::IdentifierCollision(id)) => {
                    // A concurrent request may have claimed the caller's own token.
                    if let Some(trans_id) = &request.trans_id {
                        if self.store.trans_id_exists(trans_id).await? {
                            return Err(CoreError::DuplicateTransaction(trans_id.clone()));
                        }
                    }
                    warn!(attempt, collided = %id, "booking identifier collided at commit, retrying");
                }
                other => return other,
            }
        }

        Err(CoreError::InternalError(format!(
            "could not issue unique booking identifiers after {} attempts",
            self.max_identifier_attempts
        )))
    }

    async fn try_reserve(
        &self,
        request: &ReservationRequest,
        pnr: String,
        trans_id: String,
    ) -> CoreResult<ReservationReceipt> {
        let now = Utc::now();
        let mut tx = self.ledger.open(request.flight_id).await?;

        // Fare is snapshotted against the availability the passenger saw.
        let quote = self.pricing.quote(tx.flight(), now);
        InventoryLedger::reserve_seat(tx.as_mut(), request.seat_no).await?;

        let flight = tx.flight().clone();
        let booking = tx
            .insert_booking(NewBooking {
                pnr,
                trans_id,
                flight_id: flight.flight_id,
                flight_no: flight.flight_no.clone(),
                origin: flight.origin.clone(),
                destination: flight.destination.clone(),
                passenger_name: request.passenger_name.trim().to_string(),
                passenger_contact: request.passenger_contact.trim().to_string(),
                seat_no: request.seat_no,
                status: BookingStatus::Reserved,
                price_cents: quote.fare_cents,
                created_at: now,
            })
            .await?;
        tx.commit().await?;

        info!(
            pnr = %booking.pnr,
            flight_no = %booking.flight_no,
            seat_no = booking.seat_no,
            price_cents = booking.price_cents,
            seats_available = flight.seats_available,
            "seat reserved"
        );

        Ok(ReservationReceipt {
            pnr: booking.pnr,
            trans_id: booking.trans_id,
            flight_id: booking.flight_id,
            flight_no: booking.flight_no,
            seat_no: booking.seat_no,
            status: booking.status,
            price_cents: booking.price_cents,
            message: "Seat reserved successfully".to_string(),
        })
    }

    async fn issue_pnr(&self) -> CoreResult<String> {
        for _ in 0..self.max_identifier_attempts {
            let pnr = self.ids.pnr();
            if !self.store.pnr_exists(&pnr).await? {
                return Ok(pnr);
            }
            debug!(pnr = %pnr, "generated PNR already issued");
        }
        Err(CoreError::InternalError("could not generate an unused PNR".to_string()))
    }

    async fn issue_trans_id(&self) -> CoreResult<String> {
        for _ in 0..self.max_identifier_attempts {
            let trans_id = self.ids.trans_id();
            if !self.store.trans_id_exists(&trans_id).await? {
                return Ok(trans_id);
            }
            debug!(trans_id = %trans_id, "generated transaction id already issued");
        }
        Err(CoreError::InternalError("could not generate an unused transaction id".to_string()))
    }

    /// Run the simulated payment for a Reserved booking.
    ///
    /// The booking is claimed first, so a second pay on the same PNR gets
    /// `Busy` instead of a second charge. The gateway is called without
    /// holding the flight lock; the outcome is applied afterwards against the
    /// booking as it stands under the lock.
    pub async fn simulate_payment(&self, pnr: &str) -> CoreResult<PaymentReceipt> {
        let _claim = self
            .payment_claims
            .claim(pnr)
            .ok_or_else(|| CoreError::Busy(format!("payment already in progress for {}", pnr)))?;
        let booking = self.find(pnr).await?;

        match booking.status {
            BookingStatus::Reserved => {}
            BookingStatus::Pending => {
                return Err(CoreError::InvalidTransition {
                    from: BookingStatus::Pending,
                    to: BookingStatus::Confirmed,
                })
            }
            status => return Ok(settled_payment(booking.pnr, status)),
        }

        let outcome = self.payments.charge(&booking).await?;

        let mut tx = self.ledger.open(booking.flight_id).await?;
        let current = tx
            .find_booking(pnr)
            .await?
            .ok_or_else(|| CoreError::BookingNotFound(pnr.to_string()))?;
        if current.status != BookingStatus::Reserved {
            debug!(pnr, status = %current.status, "booking changed while payment was in flight");
            return Ok(settled_payment(current.pnr, current.status));
        }

        let receipt = if outcome == PaymentStatus::Succeeded {
            let updated = tx
                .update_booking_status(current.booking_id, BookingStatus::Confirmed)
                .await?;
            tx.commit().await?;
            info!(pnr, "booking confirmed by payment");
            PaymentReceipt {
                pnr: updated.pnr,
                status: updated.status,
                message: "Payment processed successfully".to_string(),
            }
        } else {
            let seats_available = InventoryLedger::release_seat(tx.as_mut()).await?;
            let updated = tx
                .update_booking_status(current.booking_id, BookingStatus::PaymentFailed)
                .await?;
            tx.commit().await?;
            info!(pnr, seat_no = updated.seat_no, seats_available, "payment failed, seat released");
            PaymentReceipt {
                pnr: updated.pnr,
                status: updated.status,
                message: "Payment failed, seat released".to_string(),
            }
        };
        Ok(receipt)
    }

    /// Explicit confirmation without going through the payment simulation.
    pub async fn confirm(&self, pnr: &str) -> CoreResult<ConfirmationReceipt> {
        let booking = self.find(pnr).await?;
        let mut tx = self.ledger.open(booking.flight_id).await?;
        let current = tx
            .find_booking(pnr)
            .await?
            .ok_or_else(|| CoreError::BookingNotFound(pnr.to_string()))?;

        match current.status {
            BookingStatus::Confirmed => Ok(ConfirmationReceipt {
                pnr: current.pnr,
                status: current.status,
                message: "Booking already confirmed".to_string(),
            }),
            BookingStatus::Reserved => {
                let updated = tx
                    .update_booking_status(current.booking_id, BookingStatus::Confirmed)
                    .await?;
                tx.commit().await?;
                info!(pnr, "booking confirmed");
                Ok(ConfirmationReceipt {
                    pnr: updated.pnr,
                    status: updated.status,
                    message: "Booking confirmed".to_string(),
                })
            }
            from => Err(CoreError::InvalidTransition {
                from,
                to: BookingStatus::Confirmed,
            }),
        }
    }

    /// Cancel a booking, giving its seat back if it still holds one.
    /// Cancelling twice is not an error.
    pub async fn cancel(&self, pnr: &str) -> CoreResult<CancellationReceipt> {
        let booking = self.find(pnr).await?;
        let mut tx = self.ledger.open(booking.flight_id).await?;
        let current = tx
            .find_booking(pnr)
            .await?
            .ok_or_else(|| CoreError::BookingNotFound(pnr.to_string()))?;

        if current.status == BookingStatus::Cancelled {
            return Ok(CancellationReceipt {
                pnr: current.pnr,
                flight_id: current.flight_id,
                status: current.status,
                message: "Booking already cancelled".to_string(),
            });
        }

        if current.status.holds_seat() {
            let seats_available = InventoryLedger::release_seat(tx.as_mut()).await?;
            debug!(pnr, seat_no = current.seat_no, seats_available, "seat released on cancel");
        }
        let updated = tx
            .update_booking_status(current.booking_id, BookingStatus::Cancelled)
            .await?;
        tx.commit().await?;

        info!(pnr, from = %current.status, "booking cancelled");
        Ok(CancellationReceipt {
            pnr: updated.pnr,
            flight_id: updated.flight_id,
            status: updated.status,
            message: "Booking cancelled successfully".to_string(),
        })
    }

    pub async fn list_bookings(&self) -> CoreResult<Vec<Booking>> {
        self.store.list_bookings().await
    }

    pub async fn get_booking(&self, pnr: &str) -> CoreResult<Booking> {
        self.find(pnr).await
    }

    async fn find(&self, pnr: &str) -> CoreResult<Booking> {
        self.store
            .get_booking(pnr)
            .await?
            .ok_or_else(|| CoreError::BookingNotFound(pnr.to_string()))
    }
}

fn settled_payment(pnr: String, status: BookingStatus) -> PaymentReceipt {
    let message = match status {
        BookingStatus::Confirmed => "Booking already confirmed",
        BookingStatus::Cancelled => "Booking is cancelled, payment not processed",
        BookingStatus::PaymentFailed => "Payment already failed for this booking, make a new reservation",
        BookingStatus::Reserved | BookingStatus::Pending => "Payment not processed",
    };
    PaymentReceipt {
        pnr,
        status,
        message: message.to_string(),
    }
}
