//! CLI command implementations.

pub mod audit;
pub mod category;
pub mod feedback;
pub mod init;
pub mod item;
pub mod subscription;
