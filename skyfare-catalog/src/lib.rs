pub mod pricing;
pub mod inventory;
pub mod schedule;

pub use pricing::{DemandSource, FareQuote, FixedDemand, PricingConfig, PricingEngine, UniformDemand};
pub use inventory::InventoryLedger;
pub use schedule::{sample_flights, ExternalSchedule, ExternalScheduleProvider};
