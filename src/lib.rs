//! listing-pipeline - Typed item pipeline for scraped real-estate listings
//!
//! Turns loosely-typed crawler items into validated, deduplicated entities:
//! resolve the kind, normalize the fields, validate, persist.

pub mod commands;
pub mod config;
pub mod error;
pub mod feed;
pub mod format;
pub mod item;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod store;

pub use config::Config;
pub use error::{ConfigurationError, StoreError};
pub use item::{RawItem, RawValue};
pub use model::{Entity, EntityModel, ModelRegistry, NaturalKey, Value};
pub use normalize::{Amount, Currency, Normalizer, Price};
pub use pipeline::{DropReason, Pipeline, PipelineOutcome, RetryPolicy, RetryReason};
pub use store::{DatabaseManager, MemoryStore, PersistResult, SqliteStore};
