pub mod audit_trail_service;
pub mod category_service;
pub mod feedback_service;
pub mod import_service;
pub mod matcher;
pub mod subscription_service;
pub mod update_applier;

pub use audit_trail_service::AuditTrailService;
pub use category_service::{CategoryOpOutcome, CategoryService};
pub use feedback_service::{CategoryFeedbackOutcome, FeedbackService, ReclassificationOutcome};
pub use import_service::{ImportService, ImportSummary, LineItemImport};
pub use matcher::{ClassificationMatcher, MatchResult};
pub use subscription_service::SubscriptionService;
pub use update_applier::UpdateApplier;
