use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use skyfare_core::payment::{PaymentAdapter, PaymentIntent, PaymentStatus};
use skyfare_core::{Booking, CoreResult};

pub struct PaymentOrchestrator {
    adapter: Arc<dyn PaymentAdapter>,
}

impl PaymentOrchestrator {
    pub fn new(adapter: Arc<dyn PaymentAdapter>) -> Self {
        Self { adapter }
    }

    /// Charge the fare snapshot of `booking`. The booking's transaction id
    /// doubles as the intent id.
    pub async fn charge(&self, booking: &Booking) -> CoreResult<PaymentStatus> {
        let intent = PaymentIntent {
            id: booking.trans_id.clone(),
            pnr: booking.pnr.clone(),
            booking_id: booking.booking_id,
            amount_cents: booking.price_cents,
            status: PaymentStatus::Processing,
            created_at: Utc::now(),
        };

        let status = self.adapter.process_payment(&intent).await?;
        match status {
            PaymentStatus::Succeeded => {
                info!(pnr = %intent.pnr, amount_cents = intent.amount_cents, "payment succeeded")
            }
            _ => warn!(pnr = %intent.pnr, amount_cents = intent.amount_cents, ?status, "payment did not succeed"),
        }
        Ok(status)
    }
}

/// Stand-in gateway: each charge succeeds with probability `success_rate`.
pub struct SimulatedPaymentAdapter {
    success_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedPaymentAdapter {
    pub fn new(success_rate: f64) -> Self {
        Self::with_rng(success_rate, StdRng::from_entropy())
    }

    pub fn seeded(success_rate: f64, seed: u64) -> Self {
        Self::with_rng(success_rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(success_rate: f64, rng: StdRng) -> Self {
        Self {
            success_rate: if success_rate.is_finite() { success_rate.clamp(0.0, 1.0) } else { 0.0 },
            rng: Mutex::new(rng),
        }
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

#[async_trait]
impl PaymentAdapter for SimulatedPaymentAdapter {
    async fn process_payment(&self, _intent: &PaymentIntent) -> CoreResult<PaymentStatus> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        if rng.gen_bool(self.success_rate) {
            Ok(PaymentStatus::Succeeded)
        } else {
            Ok(PaymentStatus::Failed)
        }
    }
}

/// Gateway with a predetermined outcome.
#[derive(Debug, Clone, Copy)]
pub struct FixedPaymentAdapter(pub PaymentStatus);

#[async_trait]
impl PaymentAdapter for FixedPaymentAdapter {
    async fn process_payment(&self, _intent: &PaymentIntent) -> CoreResult<PaymentStatus> {
        Ok(self.0)
    }
}
