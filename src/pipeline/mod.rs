//! Per-item orchestration: resolve, normalize, validate, persist.

pub mod outcome;
pub mod retry;

use crate::item::RawItem;
use crate::model::{Entity, EntityModel, ModelRegistry, NaturalKey, Value};
use crate::normalize::Unparseable;
use crate::store::{DatabaseManager, PersistResult};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

pub use outcome::{
    DropReason, FieldIssue, FieldProblem, ItemState, PipelineOutcome, RetryReason,
    ValidationFailure,
};
pub use retry::RetryPolicy;

/// Source of the `scraped_at` timestamp.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Declared fields of one item after coercion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedItem {
    /// Fields that were present and readable
    pub values: BTreeMap<String, Value>,
    /// Fields that were present but unreadable, now treated as absent
    pub unparseable: BTreeMap<String, Unparseable>,
}

/// Coerces every declared field of `model` from `item`.
pub fn normalize_item(model: &dyn EntityModel, item: &RawItem) -> NormalizedItem {
    let mut normalized = NormalizedItem::default();

    for field in model.declared_fields() {
        let Some(raw) = item.get(&field.name) else {
            continue;
        };
        match model.coerce(&field.name, raw) {
            Ok(Some(value)) => {
                normalized.values.insert(field.name.clone(), value);
            }
            Ok(None) => {}
            Err(err) => {
                trace!(kind = model.kind(), field = %field.name, "field unparseable");
                normalized.unparseable.insert(field.name.clone(), err);
            }
        }
    }

    normalized
}

/// Builds an entity, or reports every required field that is missing or
/// unreadable along with any rule the model checks across fields.
pub fn build_entity(
    model: &dyn EntityModel,
    normalized: NormalizedItem,
    scraped_at: DateTime<Utc>,
) -> Result<Entity, ValidationFailure> {
    let NormalizedItem { mut values, unparseable } = normalized;

    let mut issues: Vec<FieldIssue> = model
        .required_fields()
        .into_iter()
        .filter(|name| !values.contains_key(*name))
        .map(|name| match unparseable.get(name) {
            Some(err) => FieldIssue::unparseable(name, err.expected.clone()),
            None => FieldIssue::missing(name),
        })
        .collect();

    for issue in model.check(&values) {
        if !issues.iter().any(|i| i.field == issue.field) {
            issues.push(issue);
        }
    }

    if !issues.is_empty() {
        return Err(ValidationFailure { issues });
    }

    let price = match model.price_field().and_then(|f| values.remove(f)) {
        Some(Value::Price(price)) => Some(price),
        Some(other) => {
            // Not a price after all; keep it as a regular field.
            if let Some(field) = model.price_field() {
                values.insert(field.to_string(), other);
            }
            None
        }
        None => None,
    };

    // Derived after the price is split off so a re-priced listing keeps its key.
    let natural_key = NaturalKey::derive(model.kind(), model.key_fields(), &values);

    Ok(Entity { kind: model.kind().to_string(), natural_key, price, fields: values, scraped_at })
}

/// Turns raw items into persisted entities.
///
/// Holds only shared, read-only state, so one instance can serve many
/// concurrent `process` calls.
pub struct Pipeline {
    registry: Arc<ModelRegistry>,
    store: Arc<dyn DatabaseManager>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn new(
        registry: Arc<ModelRegistry>,
        store: Arc<dyn DatabaseManager>,
        policy: RetryPolicy,
    ) -> Self {
        Self { registry, store, policy, clock: Arc::new(SystemClock) }
    }

    /// Replaces the clock used for `scraped_at`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn DatabaseManager> {
        &self.store
    }

    /// Runs one item through every stage and persists it.
    ///
    /// Dropping the returned future before the upsert starts leaves the store
    /// untouched.
    pub async fn process(&self, item: &RawItem, hint: Option<&str>) -> PipelineOutcome {
        let started = Instant::now();

        match self.validate(item, hint) {
            Ok(entity) => self.persist(entity, started).await,
            Err(reason) => PipelineOutcome::Dropped(reason),
        }
    }

    /// Resolves, normalizes and validates without persisting.
    pub fn validate(&self, item: &RawItem, hint: Option<&str>) -> Result<Entity, DropReason> {
        trace!(state = %ItemState::Received, "item transition");

        let model = match self.registry.resolve(item, hint) {
            Ok(model) => model,
            Err(reason) => {
                debug!(state = %ItemState::Dropped, code = reason.code(), "item transition");
                return Err(reason);
            }
        };
        let kind = model.kind();
        trace!(kind, state = %ItemState::Resolved, "item transition");

        let normalized = normalize_item(model.as_ref(), item);
        trace!(kind, state = %ItemState::Normalized, "item transition");

        match build_entity(model.as_ref(), normalized, self.clock.now()) {
            Ok(entity) => {
                trace!(kind, state = %ItemState::Validated, "item transition");
                Ok(entity)
            }
            Err(failure) => {
                debug!(
                    kind,
                    state = %ItemState::Dropped,
                    code = "validation_failure",
                    fields = ?failure.fields(),
                    "item transition"
                );
                Err(DropReason::ValidationFailure(failure))
            }
        }
    }

    async fn persist(&self, entity: Entity, started: Instant) -> PipelineOutcome {
        let attempts = self.policy.attempts();
        let timeout = self.policy.attempt_timeout();
        let kind = entity.kind.as_str();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.store.retry_delay(attempt - 1);

                if let Some(deadline) = self.policy.deadline() {
                    if started.elapsed() + delay + timeout > deadline {
                        debug!(kind, state = %ItemState::RetryPending, attempt, "item transition");
                        return PipelineOutcome::RetryPending(RetryReason::PersistenceTransient {
                            attempts: attempt - 1,
                            detail: last_error,
                        });
                    }
                }

                if !delay.is_zero() {
                    trace!(kind, attempt, delay_ms = delay.as_millis() as u64, "backing off");
                    tokio::time::sleep(delay).await;
                }
            }

            let result =
                tokio::time::timeout(timeout, self.store.upsert(&entity.natural_key, &entity)).await;
            match result {
                Ok(PersistResult::Stored { created }) => {
                    debug!(kind, state = %ItemState::Persisted, created, attempt, "item transition");
                    return PipelineOutcome::Persisted(entity);
                }
                Ok(PersistResult::Permanent(detail)) => {
                    warn!(kind, store = self.store.name(), "store rejected entity");
                    return PipelineOutcome::Dropped(DropReason::PersistenceRejected { detail });
                }
                Ok(PersistResult::Transient(detail)) => {
                    debug!(kind, attempt, store = self.store.name(), "transient store failure");
                    last_error = detail;
                }
                Err(_) => {
                    debug!(kind, attempt, store = self.store.name(), "upsert timed out");
                    last_error = format!("upsert timed out after {}ms", timeout.as_millis());
                }
            }
        }

        warn!(kind, attempts, store = self.store.name(), "persistence exhausted");
        PipelineOutcome::Dropped(DropReason::PersistenceExhausted { attempts, last_error })
    }
}
