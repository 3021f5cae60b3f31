//! Typed entities produced by the pipeline.

use crate::normalize::{Amount, Price};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// A normalized field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Integer(i64),
    Decimal(Amount),
    Price(Price),
    Boolean(bool),
    Date(NaiveDate),
    Category(String),
    Url(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) | Value::Category(s) | Value::Url(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Decimal(a) => write!(f, "{}", a),
            Value::Price(p) => write!(f, "{}", p),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Identifies one real-world listing across re-scrapes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NaturalKey(String);

impl NaturalKey {
    /// Derives the key for an entity of `kind`.
    ///
    /// Uses the first key field present, in declared order, as `kind|name=value`,
    /// so a later crawl that also carries a lower-priority identifier keeps the
    /// same key. When none of them are present, falls back to a SHA-256
    /// fingerprint of `fields`; callers pass the fields without the price so a
    /// re-priced listing keeps its key.
    pub fn derive(kind: &str, key_fields: &[String], fields: &BTreeMap<String, Value>) -> Self {
        let first = key_fields
            .iter()
            .find_map(|name| fields.get(name).map(|value| (name, value)));

        if let Some((name, value)) = first {
            return Self(format!("{}|{}={}", kind, name, value));
        }

        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        for (name, value) in fields {
            hasher.update(format!("\x1f{}={}", name, value).as_bytes());
        }
        Self(format!("{}#{:x}", kind, hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NaturalKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated, typed record for one listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: String,
    pub natural_key: NaturalKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    /// Every other normalized field that was present
    pub fields: BTreeMap<String, Value>,
    pub scraped_at: DateTime<Utc>,
}

impl Entity {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns an integer field, if present with that type.
    pub fn integer(&self, field: &str) -> Option<i64> {
        match self.get(field) {
            Some(Value::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    /// Returns a textual field (text, category or url).
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.get(field) {
            Some(Value::Text(s) | Value::Category(s) | Value::Url(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}
