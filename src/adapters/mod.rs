//! Infrastructure adapters for external systems.

pub mod classifier;
pub mod sqlite;
