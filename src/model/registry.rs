//! Model registry and discriminator resolution.

use super::builtin;
use super::schema::ModelSpec;
use super::{EntityModel, SchemaModel};
use crate::error::ConfigurationError;
use crate::item::RawItem;
use crate::normalize::Normalizer;
use crate::pipeline::DropReason;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Item field read for the discriminator unless configured otherwise.
pub const DEFAULT_DISCRIMINATOR_FIELD: &str = "discriminator";

/// A parsed discriminator pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Discriminator {
    /// Matches one value.
    Exact(String),
    /// Matches every value starting with the prefix. `*` alone is a catch-all.
    Prefix(String),
}

impl Discriminator {
    /// Parses `"apartment"` or `"listing/*"`. Patterns are case-insensitive.
    pub fn parse(pattern: &str) -> Option<Self> {
        let pattern = pattern.trim().to_lowercase();
        match pattern.strip_suffix('*') {
            Some(prefix) if !prefix.contains('*') => Some(Discriminator::Prefix(prefix.to_string())),
            Some(_) => None,
            None if pattern.is_empty() || pattern.contains('*') => None,
            None => Some(Discriminator::Exact(pattern)),
        }
    }

    /// Matches an already trimmed, lowercased value.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Discriminator::Exact(exact) => exact == value,
            Discriminator::Prefix(prefix) => value.starts_with(prefix.as_str()),
        }
    }

    /// Higher is more specific: any exact value beats any prefix, and a
    /// longer prefix beats a shorter one.
    pub fn specificity(&self) -> (u8, usize) {
        match self {
            Discriminator::Exact(exact) => (1, exact.len()),
            Discriminator::Prefix(prefix) => (0, prefix.len()),
        }
    }
}

impl std::fmt::Display for Discriminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Discriminator::Exact(exact) => f.write_str(exact),
            Discriminator::Prefix(prefix) => write!(f, "{}*", prefix),
        }
    }
}

/// Builder for a [`ModelRegistry`]. All configuration errors surface in [`build`].
///
/// [`build`]: RegistryBuilder::build
pub struct RegistryBuilder {
    normalizer: Arc<Normalizer>,
    specs: Vec<ModelSpec>,
    models: Vec<Arc<dyn EntityModel>>,
    discriminator_field: String,
}

impl RegistryBuilder {
    /// Creates an empty builder whose spec models share `normalizer`.
    pub fn new(normalizer: Arc<Normalizer>) -> Self {
        Self {
            normalizer,
            specs: Vec::new(),
            models: Vec::new(),
            discriminator_field: DEFAULT_DISCRIMINATOR_FIELD.to_string(),
        }
    }

    /// Registers the built-in listing, apartment, house and source models.
    pub fn builtins(self) -> Self {
        builtin::all().into_iter().fold(self, Self::spec)
    }

    /// Registers a declarative model.
    pub fn spec(mut self, spec: ModelSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Registers a hand-written model.
    pub fn model(mut self, model: Arc<dyn EntityModel>) -> Self {
        self.models.push(model);
        self
    }

    /// Sets the item field holding the discriminator.
    pub fn discriminator_field(mut self, field: impl Into<String>) -> Self {
        self.discriminator_field = field.into();
        self
    }

    /// Validates every model and pattern and freezes the registry.
    pub fn build(self) -> Result<ModelRegistry, ConfigurationError> {
        let mut models = self.models;
        for spec in self.specs {
            models.push(Arc::new(SchemaModel::new(spec, Arc::clone(&self.normalizer))?));
        }

        let mut by_kind: BTreeMap<String, Arc<dyn EntityModel>> = BTreeMap::new();
        for model in &models {
            if by_kind.insert(model.kind().to_string(), Arc::clone(model)).is_some() {
                return Err(ConfigurationError::DuplicateKind(model.kind().to_string()));
            }
        }

        let mut owners: BTreeMap<Discriminator, Arc<dyn EntityModel>> = BTreeMap::new();
        for model in &models {
            if model.discriminators().is_empty() {
                return Err(ConfigurationError::NoPatterns { kind: model.kind().to_string() });
            }
            for pattern in model.discriminators() {
                let parsed = Discriminator::parse(pattern).ok_or_else(|| {
                    ConfigurationError::InvalidPattern {
                        kind: model.kind().to_string(),
                        pattern: pattern.clone(),
                    }
                })?;
                match owners.get(&parsed) {
                    Some(owner) if owner.kind() == model.kind() => {}
                    Some(owner) => {
                        return Err(ConfigurationError::AmbiguousDiscriminator {
                            pattern: parsed.to_string(),
                            first: owner.kind().to_string(),
                            second: model.kind().to_string(),
                        });
                    }
                    None => {
                        owners.insert(parsed, Arc::clone(model));
                    }
                }
            }
        }

        // Most specific first, so resolution takes the first match.
        let mut routes: Vec<(Discriminator, Arc<dyn EntityModel>)> = owners.into_iter().collect();
        routes.sort_by(|a, b| b.0.specificity().cmp(&a.0.specificity()));

        debug!("Registry built with {} models and {} routes", by_kind.len(), routes.len());

        Ok(ModelRegistry { models: by_kind, routes, discriminator_field: self.discriminator_field })
    }
}

/// Immutable mapping from discriminators to models.
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<dyn EntityModel>>,
    routes: Vec<(Discriminator, Arc<dyn EntityModel>)>,
    discriminator_field: String,
}

impl ModelRegistry {
    /// Shorthand for a registry holding only the built-in models.
    pub fn with_builtins(normalizer: Arc<Normalizer>) -> Result<Self, ConfigurationError> {
        RegistryBuilder::new(normalizer).builtins().build()
    }

    /// Picks the model for an item.
    ///
    /// The item's own discriminator field wins; the crawl hint is used only
    /// when the item carries none. The most specific matching pattern wins.
    pub fn resolve(
        &self,
        item: &RawItem,
        hint: Option<&str>,
    ) -> Result<Arc<dyn EntityModel>, DropReason> {
        let discriminator = item
            .text(&self.discriminator_field)
            .map(|d| d.to_lowercase())
            .or_else(|| hint.map(|h| h.trim().to_lowercase()).filter(|h| !h.is_empty()));

        let Some(discriminator) = discriminator else {
            return Err(DropReason::UnresolvedKind { discriminator: None });
        };

        self.route(&discriminator)
            .ok_or(DropReason::UnresolvedKind { discriminator: Some(discriminator) })
    }

    /// Finds the model for a normalized discriminator value.
    pub fn route(&self, discriminator: &str) -> Option<Arc<dyn EntityModel>> {
        self.routes
            .iter()
            .find(|(pattern, _)| pattern.matches(discriminator))
            .map(|(_, model)| Arc::clone(model))
    }

    /// Looks a model up by kind.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn EntityModel>> {
        self.models.get(kind).cloned()
    }

    /// Models in kind order.
    pub fn models(&self) -> impl Iterator<Item = &Arc<dyn EntityModel>> {
        self.models.values()
    }

    pub fn discriminator_field(&self) -> &str {
        &self.discriminator_field
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
