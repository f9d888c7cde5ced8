pub mod app_config;
pub mod database;
pub mod memory;
pub mod flight_repo;
pub mod booking_repo;
pub mod fare_repo;
pub mod ledger;

pub use database::DbClient;
pub use flight_repo::PgStore;
pub use memory::InMemoryStore;
