//! revclass - revenue classification review console
//!
//! Reviewers correct how billing line items (product / rate plan / charge)
//! are categorized for revenue recognition. Free-text feedback goes to an
//! external language-model classifier; its structured decision is applied to
//! the matching records and every change lands in an append-only audit trail.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Adapters** (`adapters`): SQLite repositories and the classifier client
//! - **Service Layer** (`services`): matching, applying and category operations
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging, setup
//! - **CLI Layer** (`cli`): command-line interface

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    AuditEntry, CategoryChangeDecision, Config, FeedbackRequest, ItemReclassification,
    LineItemClassification, Subscription,
};
pub use domain::ports::Classifier;
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CategoryService, ClassificationMatcher, FeedbackService, UpdateApplier};
