//! Declarative model descriptors.

use super::entity::Value;
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The declared type of a model field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_len: Option<usize>,
    },
    Integer,
    Decimal,
    Price,
    Boolean,
    Date,
    Category {
        #[serde(default)]
        values: Vec<String>,
    },
    Url,
}

impl FieldType {
    /// Unbounded text.
    pub fn text() -> Self {
        FieldType::Text { max_len: None }
    }

    pub fn category<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldType::Category { values: values.into_iter().map(Into::into).collect() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Text { .. } => "text",
            FieldType::Integer => "integer",
            FieldType::Decimal => "decimal",
            FieldType::Price => "price",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Category { .. } => "category",
            FieldType::Url => "url",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One declared field of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,

    #[serde(flatten)]
    pub ty: FieldType,

    #[serde(default)]
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, ty: FieldType) -> Self {
        Self { name: name.into(), ty, required: true }
    }

    pub fn optional(name: impl Into<String>, ty: FieldType) -> Self {
        Self { name: name.into(), ty, required: false }
    }
}

/// Makes `field` required once the integer field `when` exceeds `above`,
/// e.g. a source page below the root must name its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub field: String,
    pub when: String,
    #[serde(default)]
    pub above: i64,
}

impl Requirement {
    pub fn when_above(field: impl Into<String>, when: impl Into<String>, above: i64) -> Self {
        Self { field: field.into(), when: when.into(), above }
    }

    /// True when the condition holds and `field` is absent.
    pub fn is_broken(&self, values: &BTreeMap<String, Value>) -> bool {
        let triggered = matches!(values.get(&self.when), Some(Value::Integer(n)) if *n > self.above);
        triggered && !values.contains_key(&self.field)
    }
}

/// Describes one entity kind: how to recognise it and which fields it carries.
///
/// ```toml
/// [[models]]
/// kind = "parking"
/// matches = ["parking", "listing/parking*"]
/// key = ["url"]
/// fields = [
///     { name = "url", type = "url", required = true },
///     { name = "price", type = "price" },
///     { name = "covered", type = "boolean" },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub kind: String,

    /// Discriminator patterns: exact values, or prefixes ending in `*`
    pub matches: Vec<String>,

    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    /// Fields that identify the real-world listing across re-scrapes
    #[serde(default)]
    pub key: Vec<String>,

    /// Field holding the entity price. Defaults to `price` when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_field: Option<String>,

    /// Fields that become required depending on other fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<Requirement>,
}

impl ModelSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            matches: Vec::new(),
            fields: Vec::new(),
            key: Vec::new(),
            price_field: None,
            requires: Vec::new(),
        }
    }

    /// Adds a discriminator pattern.
    pub fn matches(mut self, pattern: impl Into<String>) -> Self {
        self.matches.push(pattern.into());
        self
    }

    /// Adds a field declaration.
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets the natural key fields.
    pub fn key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn price_field(mut self, field: impl Into<String>) -> Self {
        self.price_field = Some(field.into());
        self
    }

    /// Adds a conditional requirement.
    pub fn requires(mut self, rule: Requirement) -> Self {
        self.requires.push(rule);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The field that feeds `Entity::price`, if any.
    pub fn resolved_price_field(&self) -> Option<&str> {
        match &self.price_field {
            Some(name) => Some(name),
            None => self
                .get_field("price")
                .filter(|f| f.ty == FieldType::Price)
                .map(|f| f.name.as_str()),
        }
    }

    /// Checks the descriptor for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.matches.is_empty() {
            return Err(ConfigurationError::NoPatterns { kind: self.kind.clone() });
        }

        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ConfigurationError::DuplicateField {
                    kind: self.kind.clone(),
                    field: field.name.clone(),
                });
            }
        }

        for name in &self.key {
            if !seen.contains(name.as_str()) {
                return Err(ConfigurationError::UnknownField {
                    kind: self.kind.clone(),
                    field: name.clone(),
                });
            }
        }

        if let Some(name) = &self.price_field {
            let field = self.get_field(name).ok_or_else(|| ConfigurationError::UnknownField {
                kind: self.kind.clone(),
                field: name.clone(),
            })?;
            if field.ty != FieldType::Price {
                return Err(ConfigurationError::PriceFieldType {
                    kind: self.kind.clone(),
                    field: name.clone(),
                });
            }
        }

        for rule in &self.requires {
            if !seen.contains(rule.field.as_str()) {
                return Err(ConfigurationError::UnknownField {
                    kind: self.kind.clone(),
                    field: rule.field.clone(),
                });
            }
            let when = self.get_field(&rule.when).ok_or_else(|| ConfigurationError::UnknownField {
                kind: self.kind.clone(),
                field: rule.when.clone(),
            })?;
            if when.ty != FieldType::Integer {
                return Err(ConfigurationError::ConditionFieldType {
                    kind: self.kind.clone(),
                    field: rule.when.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apartment() -> ModelSpec {
        ModelSpec::new("apartment")
            .matches("apartment")
            .field(FieldSpec::optional("url", FieldType::Url))
            .field(FieldSpec::optional("price", FieldType::Price))
            .field(FieldSpec::required("bedrooms", FieldType::Integer))
            .key(["url"])
    }

    #[test]
    fn test_field_type_display() {
        assert_eq!(FieldType::Integer.to_string(), "integer");
        assert_eq!(FieldType::text().to_string(), "text");
        assert_eq!(FieldType::category(["a"]).to_string(), "category");
    }

    #[test]
    fn test_valid_spec() {
        let spec = apartment();
        assert!(spec.validate().is_ok());
        assert_eq!(spec.resolved_price_field(), Some("price"));
    }

    #[test]
    fn test_no_patterns() {
        let spec = ModelSpec::new("ghost");
        assert_eq!(
            spec.validate(),
            Err(ConfigurationError::NoPatterns { kind: "ghost".into() })
        );
    }

    #[test]
    fn test_duplicate_field() {
        let spec = apartment().field(FieldSpec::optional("bedrooms", FieldType::text()));
        assert!(matches!(
            spec.validate(),
            Err(ConfigurationError::DuplicateField { ref field, .. }) if field == "bedrooms"
        ));
    }

    #[test]
    fn test_unknown_key_field() {
        let spec = apartment().key(["listing_id"]);
        assert!(matches!(
            spec.validate(),
            Err(ConfigurationError::UnknownField { ref field, .. }) if field == "listing_id"
        ));
    }

    #[test]
    fn test_price_field_must_be_price() {
        let spec = apartment().price_field("bedrooms");
        assert!(matches!(spec.validate(), Err(ConfigurationError::PriceFieldType { .. })));

        let spec = apartment().price_field("rent");
        assert!(matches!(spec.validate(), Err(ConfigurationError::UnknownField { .. })));
    }

    #[test]
    fn test_price_field_not_implied_for_other_types() {
        let spec = ModelSpec::new("odd")
            .matches("odd")
            .field(FieldSpec::optional("price", FieldType::text()));
        assert_eq!(spec.resolved_price_field(), None);
    }

    #[test]
    fn test_requirement_fields_must_be_declared() {
        let spec = apartment().requires(Requirement::when_above("parent_url", "bedrooms", 0));
        assert!(matches!(
            spec.validate(),
            Err(ConfigurationError::UnknownField { ref field, .. }) if field == "parent_url"
        ));

        let spec = apartment().requires(Requirement::when_above("url", "price", 0));
        assert!(matches!(
            spec.validate(),
            Err(ConfigurationError::ConditionFieldType { ref field, .. }) if field == "price"
        ));
    }

    #[test]
    fn test_requirement_is_broken() {
        let rule = Requirement::when_above("url", "bedrooms", 2);
        let mut values = BTreeMap::new();
        values.insert("bedrooms".to_string(), Value::Integer(2));
        assert!(!rule.is_broken(&values));

        values.insert("bedrooms".to_string(), Value::Integer(3));
        assert!(rule.is_broken(&values));

        values.insert("url".to_string(), Value::Url("https://example.com/".into()));
        assert!(!rule.is_broken(&values));
    }

    #[test]
    fn test_spec_from_toml() {
        let toml = r#"
            kind = "parking"
            matches = ["parking", "listing/parking*"]
            key = ["url"]
            fields = [
                { name = "url", type = "url", required = true },
                { name = "price", type = "price" },
                { name = "title", type = "text", max_len = 150 },
                { name = "deal", type = "category", values = ["rent", "sale"] },
                { name = "level", type = "integer" },
            ]
            requires = [{ field = "url", when = "level" }]
        "#;

        let spec: ModelSpec = toml::from_str(toml).unwrap();
        assert_eq!(spec.kind, "parking");
        assert_eq!(spec.matches.len(), 2);
        assert_eq!(spec.fields[0], FieldSpec::required("url", FieldType::Url));
        assert_eq!(spec.fields[2].ty, FieldType::Text { max_len: Some(150) });
        assert_eq!(spec.fields[3].ty, FieldType::category(["rent", "sale"]));
        assert!(!spec.fields[1].required);
        assert_eq!(spec.requires, vec![Requirement::when_above("url", "level", 0)]);
        assert!(spec.validate().is_ok());
    }
}
