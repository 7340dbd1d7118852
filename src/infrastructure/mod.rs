//! Infrastructure layer module
//!
//! Process-level concerns that sit outside the domain:
//! - Configuration management
//! - Logging infrastructure
//! - Workspace setup (config directory, database, migrations)

pub mod config;
pub mod logging;
pub mod setup;
