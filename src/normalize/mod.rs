//! Field normalization: raw scraped values into canonical typed values.
//!
//! Every normalizer is a pure function of its input and the process-wide
//! [`NormalizerConfig`]. Absence is `Ok(None)`; a value that is present but
//! cannot be read is `Err(Unparseable)`.

pub mod fields;
pub mod money;
pub mod number;
pub mod price;

use crate::error::ConfigurationError;
use crate::item::RawValue;
use crate::model::{FieldType, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub use money::{Amount, Currency, Price};
pub use number::DecimalStyle;
pub use price::{PriceParser, PriceRule};

/// What to keep from a price range like `"800–950"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Keep the lower bound as a single amount.
    #[default]
    LowerBound,
    /// Keep both bounds as `min`/`max`.
    Both,
}

/// Locale and currency defaults shared by all normalizers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Currency used when a price carries no symbol or code
    #[serde(default = "default_currency")]
    pub default_currency: String,

    #[serde(default)]
    pub decimal_style: DecimalStyle,

    #[serde(default)]
    pub range_policy: RangePolicy,

    /// Extra or overriding currency symbols, e.g. `"$" = "CAD"`
    #[serde(default)]
    pub symbols: BTreeMap<String, Currency>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            decimal_style: DecimalStyle::default(),
            range_policy: RangePolicy::default(),
            symbols: BTreeMap::new(),
        }
    }
}

/// A present value that could not be read as its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("expected {expected}")]
pub struct Unparseable {
    pub expected: FieldType,
}

/// Normalizer bound to one configuration. Immutable after construction.
pub struct Normalizer {
    config: NormalizerConfig,
    prices: PriceParser,
}

impl Normalizer {
    /// Validates the configuration and builds the price rule chain.
    pub fn new(config: NormalizerConfig) -> Result<Self, ConfigurationError> {
        let currency = Currency::new(&config.default_currency)
            .ok_or_else(|| ConfigurationError::InvalidCurrency(config.default_currency.clone()))?;
        let prices = PriceParser::new(&config, currency);
        Ok(Self { config, prices })
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Parses a price string.
    pub fn price(&self, text: &str) -> Result<Price, Unparseable> {
        self.prices.parse(text).ok_or(Unparseable { expected: FieldType::Price })
    }

    /// Normalizes one raw value to the given field type.
    pub fn normalize(&self, ty: &FieldType, raw: &RawValue) -> Result<Option<Value>, Unparseable> {
        let Some(text) = raw.as_text() else {
            return Ok(None);
        };

        let style = self.config.decimal_style;
        let value = match ty {
            FieldType::Text { max_len } => fields::text(&text, *max_len).map(Value::Text),
            FieldType::Integer => fields::integer(&text, style).map(Value::Integer),
            FieldType::Decimal => fields::decimal(&text, style).map(Value::Decimal),
            FieldType::Price => self.prices.parse(&text).map(Value::Price),
            FieldType::Boolean => fields::boolean(&text).map(Value::Boolean),
            FieldType::Date => fields::date(&text).map(Value::Date),
            FieldType::Category { values } => fields::category(&text, values).map(Value::Category),
            FieldType::Url => fields::url(&text).map(Value::Url),
        };

        value.map(Some).ok_or_else(|| Unparseable { expected: ty.clone() })
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        let config = NormalizerConfig::default();
        let prices = PriceParser::new(&config, Currency::usd());
        Self { config, prices }
    }
}
