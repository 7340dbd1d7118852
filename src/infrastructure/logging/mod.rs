//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty formatting on stderr
//! - Rolling log files with retention cleanup
//! - Secret scrubbing for raw payloads that end up in logs

pub mod config;
pub mod logger;
pub mod retention;
pub mod secret_scrubbing;

pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
pub use retention::LogRetention;
pub use secret_scrubbing::scrub_secrets;
