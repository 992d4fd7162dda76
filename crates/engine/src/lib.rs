//! Sheetsmith engine library.
//!
//! Orchestration around the pure `sheetsmith-domain` crate: character
//! storage, configuration, tracing and the use cases that run one
//! read-resolve-save transaction per character.
//!
//! ## Structure
//!
//! - `use_cases/` - User story orchestration
//! - `infrastructure/` - Ports and their adapters (stores, clock, locks)
//! - `config` - Environment configuration
//! - `app` - Application composition

pub mod app;
pub mod config;
pub mod infrastructure;
pub mod telemetry;
pub mod use_cases;

/// Test fixtures shared by the unit tests.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;
pub use config::EngineConfig;
