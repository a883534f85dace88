//! Infrastructure layer: configuration, Postgres, Redis, bootstrap data.

pub mod config;
pub mod db;
pub mod seed;

/// Redis adapters (revocation set).
#[cfg(feature = "redis")]
pub mod redis;

pub use config::{AppConfig, ConfigError};
pub use seed::{SeedError, SeedReport, seed_demo_data};
