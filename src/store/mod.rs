//! Persistence contract and the stores shipped with the crate.

pub mod memory;
pub mod sqlite;

use crate::error::StoreError;
use crate::model::{Entity, NaturalKey};
use async_trait::async_trait;
use std::time::Duration;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Result of one upsert call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistResult {
    /// Written; `created` is false when an existing record was superseded.
    Stored { created: bool },
    /// Worth retrying (busy, unavailable, timed out).
    Transient(String),
    /// Will fail again.
    Permanent(String),
}

/// Trait for entity persistence - enables fakes for tests.
///
/// `upsert` must be idempotent per natural key and atomic: a call that is
/// cancelled or fails leaves either the old record or the new one.
#[async_trait]
pub trait DatabaseManager: Send + Sync {
    /// Inserts or supersedes the record for `key`.
    async fn upsert(&self, key: &NaturalKey, entity: &Entity) -> PersistResult;

    /// Fetches the current record for `key`.
    async fn get(&self, key: &NaturalKey) -> Result<Option<Entity>, StoreError>;

    /// Counts records, optionally of one kind.
    async fn count(&self, kind: Option<&str>) -> Result<u64, StoreError>;

    /// Pause before retry number `attempt` (1-based). No backoff by default.
    fn retry_delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
