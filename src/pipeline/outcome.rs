//! Typed results of processing one item.

use crate::model::{Entity, FieldType};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The per-item lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Received,
    Resolved,
    Normalized,
    Validated,
    Persisted,
    Dropped,
    RetryPending,
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemState::Received => "received",
            ItemState::Resolved => "resolved",
            ItemState::Normalized => "normalized",
            ItemState::Validated => "validated",
            ItemState::Persisted => "persisted",
            ItemState::Dropped => "dropped",
            ItemState::RetryPending => "retry_pending",
        };
        f.write_str(name)
    }
}

/// Why a field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum FieldProblem {
    Missing,
    Unparseable { expected: FieldType },
}

/// One offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    #[serde(flatten)]
    pub problem: FieldProblem,
}

impl FieldIssue {
    pub fn missing(field: impl Into<String>) -> Self {
        Self { field: field.into(), problem: FieldProblem::Missing }
    }

    pub fn unparseable(field: impl Into<String>, expected: FieldType) -> Self {
        Self { field: field.into(), problem: FieldProblem::Unparseable { expected } }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            FieldProblem::Missing => write!(f, "{} (missing)", self.field),
            FieldProblem::Unparseable { expected } => {
                write!(f, "{} (expected {})", self.field, expected)
            }
        }
    }
}

/// Every required field that was missing or unreadable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub issues: Vec<FieldIssue>,
}

impl ValidationFailure {
    /// Names of the offending fields.
    pub fn fields(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.field.as_str()).collect()
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let issues: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        write!(f, "invalid fields: {}", issues.join(", "))
    }
}

/// Terminal, non-retryable failure for one item.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DropReason {
    #[error("no model registered for discriminator {discriminator:?}")]
    UnresolvedKind { discriminator: Option<String> },

    #[error("{0}")]
    ValidationFailure(ValidationFailure),

    #[error("persistence failed after {attempts} attempts: {last_error}")]
    PersistenceExhausted { attempts: u32, last_error: String },

    #[error("store rejected entity: {detail}")]
    PersistenceRejected { detail: String },
}

impl DropReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            DropReason::UnresolvedKind { .. } => "unresolved_kind",
            DropReason::ValidationFailure(_) => "validation_failure",
            DropReason::PersistenceExhausted { .. } => "persistence_exhausted",
            DropReason::PersistenceRejected { .. } => "persistence_rejected",
        }
    }
}

impl From<ValidationFailure> for DropReason {
    fn from(failure: ValidationFailure) -> Self {
        DropReason::ValidationFailure(failure)
    }
}

/// Transient failure handed back to the caller for a later retry.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RetryReason {
    /// The call deadline ran out while the store was still failing.
    #[error("store still failing after {attempts} attempts: {detail}")]
    PersistenceTransient { attempts: u32, detail: String },
}

impl RetryReason {
    pub fn code(&self) -> &'static str {
        match self {
            RetryReason::PersistenceTransient { .. } => "persistence_transient",
        }
    }
}

/// What happened to one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Persisted(Entity),
    Dropped(DropReason),
    RetryPending(RetryReason),
}

impl PipelineOutcome {
    pub fn state(&self) -> ItemState {
        match self {
            PipelineOutcome::Persisted(_) => ItemState::Persisted,
            PipelineOutcome::Dropped(_) => ItemState::Dropped,
            PipelineOutcome::RetryPending(_) => ItemState::RetryPending,
        }
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self, PipelineOutcome::Persisted(_))
    }

    pub fn entity(&self) -> Option<&Entity> {
        match self {
            PipelineOutcome::Persisted(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn drop_reason(&self) -> Option<&DropReason> {
        match self {
            PipelineOutcome::Dropped(reason) => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure() -> ValidationFailure {
        ValidationFailure {
            issues: vec![
                FieldIssue::missing("bedrooms"),
                FieldIssue::unparseable("price", FieldType::Price),
            ],
        }
    }

    #[test]
    fn test_validation_failure_display() {
        assert_eq!(
            failure().to_string(),
            "invalid fields: bedrooms (missing), price (expected price)"
        );
        assert_eq!(failure().fields(), vec!["bedrooms", "price"]);
    }

    #[test]
    fn test_drop_reason_codes() {
        let reason = DropReason::UnresolvedKind { discriminator: Some("houseboat".into()) };
        assert_eq!(reason.code(), "unresolved_kind");
        assert_eq!(DropReason::from(failure()).code(), "validation_failure");

        let reason = DropReason::PersistenceExhausted { attempts: 3, last_error: "timeout".into() };
        assert_eq!(reason.code(), "persistence_exhausted");
        assert_eq!(reason.to_string(), "persistence failed after 3 attempts: timeout");
    }

    #[test]
    fn test_drop_reason_serde() {
        let json = serde_json::to_value(DropReason::from(failure())).unwrap();
        assert_eq!(json["code"], "validation_failure");
        assert_eq!(json["issues"][0]["field"], "bedrooms");
        assert_eq!(json["issues"][0]["problem"], "missing");
        assert_eq!(json["issues"][1]["problem"], "unparseable");
        assert_eq!(json["issues"][1]["expected"]["type"], "price");
    }

    #[test]
    fn test_outcome_serde() {
        let outcome = PipelineOutcome::RetryPending(RetryReason::PersistenceTransient {
            attempts: 2,
            detail: "database is locked".into(),
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "retry_pending");
        assert_eq!(json["detail"]["code"], "persistence_transient");
        assert_eq!(outcome.state(), ItemState::RetryPending);
        assert!(!outcome.is_persisted());
    }

    #[test]
    fn test_item_state_display() {
        assert_eq!(ItemState::RetryPending.to_string(), "retry_pending");
        assert_eq!(ItemState::Received.to_string(), "received");
    }
}
