//! Raw scraped items, as handed over by the crawler.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// A single scraped value before any coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Returns a trimmed textual view, or `None` when the value is absent.
    ///
    /// `Null` and whitespace-only text both count as absent.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            RawValue::Null => None,
            RawValue::Bool(b) => Some(Cow::Owned(b.to_string())),
            RawValue::Int(i) => Some(Cow::Owned(i.to_string())),
            RawValue::Float(f) => Some(Cow::Owned(f.to_string())),
            RawValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Cow::Borrowed(trimmed))
                }
            }
        }
    }

    /// Returns true if this value carries nothing usable.
    pub fn is_absent(&self) -> bool {
        self.as_text().is_none()
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Int(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

/// An untyped mapping of scraped field names to values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawItem {
    fields: BTreeMap<String, RawValue>,
}

impl RawItem {
    /// Creates an empty item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Returns the raw value of a field.
    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.get(name)
    }

    /// Returns the trimmed text of a field, if present.
    pub fn text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).and_then(RawValue::as_text)
    }

    /// Returns the field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawItem {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_text_trims() {
        assert_eq!(RawValue::from("  $1,250 ").as_text().as_deref(), Some("$1,250"));
        assert_eq!(RawValue::Int(2).as_text().as_deref(), Some("2"));
        assert_eq!(RawValue::Bool(true).as_text().as_deref(), Some("true"));
    }

    #[test]
    fn test_absent_values() {
        assert!(RawValue::Null.is_absent());
        assert!(RawValue::from("   ").is_absent());
        assert!(RawValue::from("").is_absent());
        assert!(!RawValue::from("x").is_absent());
    }

    #[test]
    fn test_item_from_json() {
        let json = r#"{"discriminator": "apartment", "price": "$1,250", "bedrooms": 2, "note": null, "area": 54.5}"#;
        let item: RawItem = serde_json::from_str(json).unwrap();

        assert_eq!(item.len(), 5);
        assert_eq!(item.get("bedrooms"), Some(&RawValue::Int(2)));
        assert_eq!(item.get("note"), Some(&RawValue::Null));
        assert_eq!(item.get("area"), Some(&RawValue::Float(54.5)));
        assert_eq!(item.text("price").as_deref(), Some("$1,250"));
        assert!(item.text("note").is_none());
        assert!(item.text("missing").is_none());
    }

    #[test]
    fn test_item_builder_and_iter() {
        let item = RawItem::new().with("b", "2").with("a", 1i64);
        assert_eq!(item.names().collect::<Vec<_>>(), vec!["a", "b"]);

        let collected: RawItem = vec![("x", "1"), ("y", "2")].into_iter().collect();
        assert_eq!(collected.len(), 2);
        assert!(!collected.is_empty());
    }
}
