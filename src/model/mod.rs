//! Entity models: what each listing kind looks like and how its raw fields
//! are coerced.

pub mod builtin;
pub mod entity;
pub mod registry;
pub mod schema;

use crate::error::ConfigurationError;
use crate::item::RawValue;
use crate::normalize::{Normalizer, Unparseable};
use crate::pipeline::FieldIssue;
use std::collections::BTreeMap;
use std::sync::Arc;

pub use entity::{Entity, NaturalKey, Value};
pub use registry::{Discriminator, ModelRegistry, RegistryBuilder};
pub use schema::{FieldSpec, FieldType, ModelSpec, Requirement};

/// The capability set the pipeline uses for every kind.
///
/// The pipeline never inspects concrete model types; a new kind only needs a
/// new implementation (or a [`ModelSpec`]) registered in the registry.
pub trait EntityModel: Send + Sync {
    /// Kind stamped on entities built from this model.
    fn kind(&self) -> &str;

    /// Discriminator patterns routed to this model.
    fn discriminators(&self) -> &[String];

    fn declared_fields(&self) -> &[FieldSpec];

    fn required_fields(&self) -> Vec<&str> {
        self.declared_fields().iter().filter(|f| f.required).map(|f| f.name.as_str()).collect()
    }

    /// Fields that make up the natural key.
    fn key_fields(&self) -> &[String];

    /// Field feeding `Entity::price`, if the model has one.
    fn price_field(&self) -> Option<&str>;

    /// Coerces one raw value for a declared field. Undeclared fields are absent.
    fn coerce(&self, field: &str, raw: &RawValue) -> Result<Option<Value>, Unparseable>;

    /// Rules spanning several fields, run on the coerced values. Returns one
    /// issue per broken rule.
    fn check(&self, _values: &BTreeMap<String, Value>) -> Vec<FieldIssue> {
        Vec::new()
    }
}

/// An [`EntityModel`] driven by a declarative [`ModelSpec`].
pub struct SchemaModel {
    spec: ModelSpec,
    price_field: Option<String>,
    normalizer: Arc<Normalizer>,
}

impl SchemaModel {
    /// Validates the spec and binds it to a normalizer.
    pub fn new(spec: ModelSpec, normalizer: Arc<Normalizer>) -> Result<Self, ConfigurationError> {
        spec.validate()?;
        let price_field = spec.resolved_price_field().map(str::to_string);
        Ok(Self { spec, price_field, normalizer })
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }
}

impl EntityModel for SchemaModel {
    fn kind(&self) -> &str {
        &self.spec.kind
    }

    fn discriminators(&self) -> &[String] {
        &self.spec.matches
    }

    fn declared_fields(&self) -> &[FieldSpec] {
        &self.spec.fields
    }

    fn key_fields(&self) -> &[String] {
        &self.spec.key
    }

    fn price_field(&self) -> Option<&str> {
        self.price_field.as_deref()
    }

    fn coerce(&self, field: &str, raw: &RawValue) -> Result<Option<Value>, Unparseable> {
        match self.spec.get_field(field) {
            Some(spec) => self.normalizer.normalize(&spec.ty, raw),
            None => Ok(None),
        }
    }

    fn check(&self, values: &BTreeMap<String, Value>) -> Vec<FieldIssue> {
        self.spec
            .requires
            .iter()
            .filter(|rule| rule.is_broken(values))
            .map(|rule| FieldIssue::missing(rule.field.as_str()))
            .collect()
    }
}

impl std::fmt::Debug for SchemaModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaModel").field("kind", &self.spec.kind).finish()
    }
}
