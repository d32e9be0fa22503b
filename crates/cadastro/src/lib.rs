pub mod config;
pub mod error;
pub mod pessoas;
pub mod telemetry;
