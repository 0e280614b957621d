pub mod app_config;
pub mod attempt_repo;
pub mod booking_repo;
pub mod database;
pub mod error;
pub mod events;
pub mod flight_repo;
pub mod redis_repo;
pub mod seat_repo;
pub mod seed;

pub use attempt_repo::PgAttemptLog;
pub use booking_repo::PgBookingStore;
pub use database::DbClient;
pub use error::StoreError;
pub use events::EventProducer;
pub use flight_repo::PgFlightCatalog;
pub use redis_repo::RedisClient;
