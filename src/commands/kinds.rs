//! Kinds command implementation.

use crate::config::Config;
use crate::format::{Formatter, KindSummary};
use anyhow::{Context, Result};

/// Lists the registered entity models.
pub struct KindsCommand {
    config: Config,
}

impl KindsCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<String> {
        let kinds = self.summaries()?;
        Ok(Formatter::new(self.config.format).format_kinds(&kinds))
    }

    /// Summaries of every model in kind order.
    pub fn summaries(&self) -> Result<Vec<KindSummary>> {
        let registry = self.config.registry().context("Invalid model configuration")?;

        Ok(registry
            .models()
            .map(|model| KindSummary {
                kind: model.kind().to_string(),
                matches: model.discriminators().to_vec(),
                required: model.required_fields().into_iter().map(str::to_string).collect(),
                key: model.key_fields().to_vec(),
                price_field: model.price_field().map(str::to_string),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldSpec, FieldType, ModelSpec};

    #[test]
    fn test_builtin_kinds() {
        let kinds = KindsCommand::new(Config::default()).summaries().unwrap();
        let names: Vec<_> = kinds.iter().map(|k| k.kind.as_str()).collect();
        assert_eq!(names, vec!["apartment", "house", "listing", "source"]);

        let apartment = &kinds[0];
        assert!(apartment.required.contains(&"bedrooms".to_string()));
        assert_eq!(apartment.price_field.as_deref(), Some("price"));
        assert!(kinds[3].price_field.is_none());
    }

    #[test]
    fn test_configured_kinds() {
        let mut config = Config { builtin_models: false, ..Config::default() };
        config.models.push(
            ModelSpec::new("parking")
                .matches("parking")
                .field(FieldSpec::required("url", FieldType::Url))
                .key(["url"]),
        );

        let output = KindsCommand::new(config).execute().unwrap();
        assert!(output.contains("parking"));
        assert!(!output.contains("apartment"));
    }

    #[test]
    fn test_invalid_models_fail() {
        let mut config = Config::default();
        config.models.push(ModelSpec::new("empty"));

        let err = KindsCommand::new(config).execute().unwrap_err();
        assert!(err.to_string().contains("Invalid model configuration"));
    }
}
