//! HTTP API handlers for ats-survey

pub mod health;
pub mod participants;
pub mod pool;
pub mod settings;

pub use health::health_routes;
pub use participants::participant_routes;
pub use pool::pool_routes;
pub use settings::settings_routes;
