//! CLI command implementations.

pub mod check;
pub mod count;
pub mod ingest;
pub mod kinds;

use crate::pipeline::{DropReason, PipelineOutcome, RetryReason};
use serde::Serialize;
use std::collections::BTreeMap;

pub use check::CheckCommand;
pub use count::CountCommand;
pub use ingest::IngestCommand;
pub use kinds::KindsCommand;

/// Where an item came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    pub feed: String,
    /// Zero-based position in the feed
    pub index: usize,
}

/// Why an item did not make it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Failure {
    Dropped(DropReason),
    RetryPending(RetryReason),
}

impl Failure {
    pub fn code(&self) -> &'static str {
        match self {
            Failure::Dropped(reason) => reason.code(),
            Failure::RetryPending(reason) => reason.code(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Dropped(reason) => write!(f, "{}", reason),
            Failure::RetryPending(reason) => write!(f, "{}", reason),
        }
    }
}

/// One failed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    #[serde(flatten)]
    pub origin: Origin,
    pub failure: Failure,
}

/// Aggregated outcomes of an ingest or check run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub command: String,
    pub dry_run: bool,
    pub feeds: usize,
    pub items: usize,
    /// Persisted (ingest) or valid (check)
    pub accepted: usize,
    pub dropped: usize,
    pub retry_pending: usize,
    /// Failure counts by reason code
    pub reasons: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ItemFailure>,
}

impl RunReport {
    pub fn new(command: &str) -> Self {
        Self { command: command.to_string(), ..Default::default() }
    }

    /// Adds one pipeline outcome.
    pub fn record(&mut self, origin: Origin, outcome: PipelineOutcome) {
        self.items += 1;
        match outcome {
            PipelineOutcome::Persisted(_) => self.accepted += 1,
            PipelineOutcome::Dropped(reason) => {
                self.dropped += 1;
                self.fail(origin, Failure::Dropped(reason));
            }
            PipelineOutcome::RetryPending(reason) => {
                self.retry_pending += 1;
                self.fail(origin, Failure::RetryPending(reason));
            }
        }
    }

    /// Adds one validation-only result.
    pub fn record_check(&mut self, origin: Origin, result: Result<(), DropReason>) {
        self.items += 1;
        match result {
            Ok(()) => self.accepted += 1,
            Err(reason) => {
                self.dropped += 1;
                self.fail(origin, Failure::Dropped(reason));
            }
        }
    }

    fn fail(&mut self, origin: Origin, failure: Failure) {
        *self.reasons.entry(failure.code().to_string()).or_default() += 1;
        self.failures.push(ItemFailure { origin, failure });
    }

    /// True when every item was accepted.
    pub fn is_clean(&self) -> bool {
        self.dropped == 0 && self.retry_pending == 0
    }
}
