//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that adapters implement:
//! - ClassificationRepository: line-item classification records
//! - CategoryRepository: the category catalog
//! - SubscriptionRepository: subscription records
//! - AuditRepository: the append-only audit trail
//! - Classifier: the external language-model classifier
//!
//! Services depend only on these traits, so tests can swap in fakes.

pub mod audit_repository;
pub mod category_repository;
pub mod classification_repository;
pub mod classifier;
pub mod subscription_repository;

pub use audit_repository::{AuditFilter, AuditRepository};
pub use category_repository::CategoryRepository;
pub use classification_repository::{CandidateQuery, ClassificationPatch, ClassificationRepository};
pub use classifier::Classifier;
pub use subscription_repository::SubscriptionRepository;
