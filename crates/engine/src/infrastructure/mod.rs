//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod clock;
pub mod locks;
pub mod memory_store;
pub mod ports;
pub mod sqlite_store;
