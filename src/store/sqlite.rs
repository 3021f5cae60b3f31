//! SQLite-backed store.

use super::{DatabaseManager, PersistResult};
use crate::error::StoreError;
use crate::model::{Entity, NaturalKey};
use async_trait::async_trait;
use chrono::Utc;
use rand::RngExt;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, trace};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS entities (
        natural_key   TEXT PRIMARY KEY,
        kind          TEXT NOT NULL,
        price_min     TEXT,
        price_max     TEXT,
        currency      TEXT,
        body          TEXT NOT NULL,
        scraped_at    TEXT NOT NULL,
        first_seen_at TEXT NOT NULL,
        updated_at    TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_entities_kind ON entities(kind);
";

const BUSY_TIMEOUT: Duration = Duration::from_millis(250);
const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Stores one row per natural key. Blocking calls run on tokio's blocking pool.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    backoff: Duration,
}

impl SqliteStore {
    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        debug!("Opening database: {}", path.display());
        Self::init(Connection::open(path)?)
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)), backoff: DEFAULT_BACKOFF })
    }

    /// Sets the base delay for exponential retry backoff.
    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff = base;
        self
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))?;
            f(&conn)
        })
        .await?
    }
}

/// Writes one entity; returns true when the key was new.
fn write_entity(
    conn: &Connection,
    key: &str,
    entity: &Entity,
    body: &str,
) -> Result<bool, StoreError> {
    let tx = conn.unchecked_transaction()?;

    let exists = tx
        .query_row("SELECT 1 FROM entities WHERE natural_key = ?1", [key], |_| Ok(()))
        .optional()?
        .is_some();

    let price = entity.price.as_ref();
    let now = Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO entities
            (natural_key, kind, price_min, price_max, currency, body, scraped_at, first_seen_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
        ON CONFLICT(natural_key) DO UPDATE SET
            kind = excluded.kind,
            price_min = excluded.price_min,
            price_max = excluded.price_max,
            currency = excluded.currency,
            body = excluded.body,
            scraped_at = excluded.scraped_at,
            updated_at = excluded.updated_at",
        params![
            key,
            entity.kind,
            price.map(|p| p.min.to_string()),
            price.and_then(|p| p.max).map(|m| m.to_string()),
            price.map(|p| p.currency.code().to_string()),
            body,
            entity.scraped_at.to_rfc3339(),
            now,
        ],
    )?;

    tx.commit()?;
    Ok(!exists)
}

#[async_trait]
impl DatabaseManager for SqliteStore {
    async fn upsert(&self, key: &NaturalKey, entity: &Entity) -> PersistResult {
        let body = match serde_json::to_string(entity) {
            Ok(body) => body,
            Err(err) => return PersistResult::Permanent(StoreError::from(err).to_string()),
        };

        let key = key.as_str().to_string();
        let entity = entity.clone();
        let result = self.blocking(move |conn| write_entity(conn, &key, &entity, &body)).await;

        match result {
            Ok(created) => {
                trace!(created, "entity row written");
                PersistResult::Stored { created }
            }
            Err(err) if err.is_transient() => PersistResult::Transient(err.to_string()),
            Err(err) => PersistResult::Permanent(err.to_string()),
        }
    }

    async fn get(&self, key: &NaturalKey) -> Result<Option<Entity>, StoreError> {
        let key = key.as_str().to_string();
        let body: Option<String> = self
            .blocking(move |conn| {
                Ok(conn
                    .query_row("SELECT body FROM entities WHERE natural_key = ?1", [&key], |row| {
                        row.get(0)
                    })
                    .optional()?)
            })
            .await?;

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn count(&self, kind: Option<&str>) -> Result<u64, StoreError> {
        let kind = kind.map(str::to_string);
        let n: i64 = self
            .blocking(move |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM entities WHERE ?1 IS NULL OR kind = ?1",
                    [&kind],
                    |row| row.get(0),
                )?)
            })
            .await?;
        Ok(u64::try_from(n).unwrap_or_default())
    }

    /// Exponential backoff with jitter: `base * 2^(attempt-1) + rand(0..base)`.
    fn retry_delay(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.backoff.as_millis()).unwrap_or(u64::MAX);
        if base_ms == 0 {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        let jitter = rand::rng().random_range(0..base_ms);
        Duration::from_millis(base_ms.saturating_mul(1u64 << exponent).saturating_add(jitter))
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
