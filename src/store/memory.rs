//! In-process store used for dry runs and tests.

use super::{DatabaseManager, PersistResult};
use crate::error::StoreError;
use crate::model::{Entity, NaturalKey};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Keeps the latest entity per natural key in memory.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<NaturalKey, Entity>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Copies out every record in key order.
    pub async fn entities(&self) -> Vec<Entity> {
        self.records.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl DatabaseManager for MemoryStore {
    async fn upsert(&self, key: &NaturalKey, entity: &Entity) -> PersistResult {
        let previous = self.records.write().await.insert(key.clone(), entity.clone());
        PersistResult::Stored { created: previous.is_none() }
    }

    async fn get(&self, key: &NaturalKey) -> Result<Option<Entity>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn count(&self, kind: Option<&str>) -> Result<u64, StoreError> {
        let records = self.records.read().await;
        let n = match kind {
            Some(kind) => records.values().filter(|e| e.kind == kind).count(),
            None => records.len(),
        };
        Ok(n as u64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entity(kind: &str, key: &str, bedrooms: i64) -> Entity {
        let mut fields = BTreeMap::new();
        fields.insert("bedrooms".to_string(), crate::model::Value::Integer(bedrooms));
        Entity {
            kind: kind.to_string(),
            natural_key: NaturalKey::from(key),
            price: None,
            fields,
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = MemoryStore::new();
        let first = entity("apartment", "apartment|url=a", 2);
        let second = entity("apartment", "apartment|url=a", 3);

        let r1 = store.upsert(&first.natural_key, &first).await;
        let r2 = store.upsert(&second.natural_key, &second).await;

        assert_eq!(r1, PersistResult::Stored { created: true });
        assert_eq!(r2, PersistResult::Stored { created: false });
        assert_eq!(store.len().await, 1);

        let stored = store.get(&first.natural_key).await.unwrap().unwrap();
        assert_eq!(stored.integer("bedrooms"), Some(3));
    }

    #[tokio::test]
    async fn test_count_by_kind() {
        let store = MemoryStore::new();
        for (kind, key) in [("apartment", "a"), ("apartment", "b"), ("house", "c")] {
            let e = entity(kind, key, 1);
            store.upsert(&e.natural_key, &e).await;
        }

        assert_eq!(store.count(None).await.unwrap(), 3);
        assert_eq!(store.count(Some("apartment")).await.unwrap(), 2);
        assert_eq!(store.count(Some("source")).await.unwrap(), 0);
        assert_eq!(store.name(), "memory");
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);
        assert!(store.get(&NaturalKey::from("nope")).await.unwrap().is_none());
    }
}
