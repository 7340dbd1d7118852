pub mod audit;
pub mod category;
pub mod classification;
pub mod config;
pub mod decision;
pub mod feedback;
pub mod subscription;

pub use audit::{AuditAction, AuditEntry, AuditTarget};
pub use category::{numbered_taxonomy, CategoryCatalogEntry, CategoryStats, CATEGORY_TAXONOMY};
pub use classification::{
    ClassificationStatus, ConfidenceBand, LineItemClassification, HIGH_CONFIDENCE_THRESHOLD,
    LOW_CONFIDENCE_THRESHOLD,
};
pub use config::{ClassifierConfig, Config, DatabaseConfig, LoggingConfig, MatchingConfig};
pub use decision::{
    AmortizationTechnique, CategoryChangeDecision, ItemReclassification, RevenueRecognitionTiming,
};
pub use feedback::{CategoryFeedbackPrompt, FeedbackRequest, ItemFeedbackPrompt, MAX_PROMPT_SAMPLE};
pub use subscription::{
    BillingPeriod, DerivationTrace, Subscription, SubscriptionPatch, SubscriptionStatus,
};
