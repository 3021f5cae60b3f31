//! Count command implementation.

use crate::config::Config;
use crate::format::Formatter;
use crate::store::{DatabaseManager, SqliteStore};
use anyhow::{Context, Result};

/// Counts stored entities, optionally for one kind.
pub struct CountCommand {
    config: Config,
}

impl CountCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn execute(&self, kind: Option<&str>) -> Result<String> {
        let store = SqliteStore::open(&self.config.database).with_context(|| {
            format!("Failed to open database: {}", self.config.database.display())
        })?;
        self.execute_with_store(&store, kind).await
    }

    /// Executes against a provided store (for testing).
    pub async fn execute_with_store(
        &self,
        store: &dyn DatabaseManager,
        kind: Option<&str>,
    ) -> Result<String> {
        let count = store.count(kind).await.context("Failed to count entities")?;
        Ok(Formatter::new(self.config.format).format_count(kind, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::model::{Entity, NaturalKey};
    use crate::store::MemoryStore;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn entity(kind: &str, key: &str) -> Entity {
        Entity {
            kind: kind.to_string(),
            natural_key: NaturalKey::from(key),
            price: None,
            fields: BTreeMap::new(),
            scraped_at: Utc::now(),
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (kind, key) in [("apartment", "a1"), ("apartment", "a2"), ("house", "h1")] {
            let e = entity(kind, key);
            store.upsert(&e.natural_key, &e).await;
        }
        store
    }

    #[tokio::test]
    async fn test_count_table() {
        let store = seeded().await;
        let cmd = CountCommand::new(Config::default());

        let output = cmd.execute_with_store(&store, Some("apartment")).await.unwrap();
        assert_eq!(output, "apartment: 2");

        let output = cmd.execute_with_store(&store, None).await.unwrap();
        assert_eq!(output, "all kinds: 3");
    }

    #[tokio::test]
    async fn test_count_json() {
        let store = seeded().await;
        let cmd = CountCommand::new(Config { format: OutputFormat::Json, ..Config::default() });

        let output = cmd.execute_with_store(&store, Some("house")).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["kind"], "house");
        assert_eq!(json["count"], 1);
    }

    #[tokio::test]
    async fn test_count_sqlite_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config { database: dir.path().join("listings.db"), ..Config::default() };

        let output = CountCommand::new(config).execute(None).await.unwrap();
        assert_eq!(output, "all kinds: 0");
    }
}
