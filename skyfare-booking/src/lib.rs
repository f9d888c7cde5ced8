pub mod pnr;
pub mod orchestrator;
pub mod manager;
pub mod fares;
pub mod market;

pub use fares::{FareService, FlightView, DEFAULT_HISTORY_LIMIT};
pub use manager::{
    BookingManager, CancellationReceipt, ConfirmationReceipt, PaymentReceipt, ReservationReceipt, ReservationRequest,
};
pub use market::{BatchReport, FixedStep, MarketSimulator, RandomSteps, StepSource};
pub use orchestrator::{FixedPaymentAdapter, PaymentOrchestrator, SimulatedPaymentAdapter};
pub use pnr::{IdSource, RandomIds};
