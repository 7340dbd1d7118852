//! Domain errors for the revclass review console.
//!
//! Every failure coming out of an external collaborator (record store,
//! classifier endpoint) is converted into one of these variants at the port
//! boundary. Nothing above the adapters sees a raw transport error.

use thiserror::Error;

/// Domain-level errors that can occur in the revclass system.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Store read or write failed.
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Network or HTTP failure calling the external classifier.
    #[error("Classifier unavailable: {0}")]
    ClassifierUnavailable(String),

    /// The classifier responded, but not in the required structured shape.
    #[error("Classifier contract violation: {reason}")]
    ClassifierContractViolation { reason: String, raw: String },

    /// Input rejected before any network call was made.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A multi-step operation failed after some steps were already applied.
    /// Applied steps are left in place.
    #[error("{operation} partially applied: '{completed}' succeeded, '{failed}' failed: {reason}")]
    PartialFailure {
        operation: &'static str,
        completed: &'static str,
        failed: &'static str,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn contract_violation(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::ClassifierContractViolation {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable tag for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DataAccess(_) => "data_access",
            Self::ClassifierUnavailable(_) => "classifier_unavailable",
            Self::ClassifierContractViolation { .. } => "classifier_contract_violation",
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::PartialFailure { .. } => "partial_failure",
            Self::Serialization(_) => "serialization",
        }
    }

    /// Text shown to the end user. Internal detail is kept out of the
    /// generic failures; it goes to the logs instead.
    pub fn user_message(&self) -> String {
        match self {
            Self::DataAccess(_) | Self::Serialization(_) => {
                "Something went wrong while saving your changes. Please try again.".to_string()
            }
            Self::ClassifierUnavailable(_) => {
                "The classification service is unavailable right now. Please retry in a moment."
                    .to_string()
            }
            Self::ClassifierContractViolation { .. } => {
                "The classification service returned an unusable answer. No changes were made."
                    .to_string()
            }
            Self::Validation(msg) => msg.clone(),
            Self::NotFound { entity, id } => format!("{entity} {id} does not exist."),
            Self::PartialFailure {
                completed, failed, ..
            } => format!(
                "The operation stopped part way: '{completed}' was applied but '{failed}' failed. \
                 The applied part has been kept."
            ),
        }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DataAccess(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
