//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::error::ConfigurationError;
use crate::model::registry::DEFAULT_DISCRIMINATOR_FIELD;
use crate::model::{ModelRegistry, ModelSpec, RegistryBuilder};
use crate::normalize::{Normalizer, NormalizerConfig};
use crate::pipeline::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Item field holding the discriminator
    #[serde(default = "default_discriminator_field")]
    pub discriminator_field: String,

    /// Currency and number parsing defaults
    #[serde(default)]
    pub normalizer: NormalizerConfig,

    /// Persistence retry bounds
    #[serde(default)]
    pub retry: RetryPolicy,

    /// SQLite database file
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Base backoff between persistence retries in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Items processed concurrently during ingest
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Register the built-in listing, apartment, house and source models
    #[serde(default = "default_true")]
    pub builtin_models: bool,

    /// Additional models
    #[serde(default)]
    pub models: Vec<ModelSpec>,
}

fn default_discriminator_field() -> String {
    DEFAULT_DISCRIMINATOR_FIELD.to_string()
}

fn default_database() -> PathBuf {
    PathBuf::from("listings.db")
}

fn default_backoff_ms() -> u64 {
    100
}

fn default_jobs() -> usize {
    8
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discriminator_field: default_discriminator_field(),
            normalizer: NormalizerConfig::default(),
            retry: RetryPolicy::default(),
            database: default_database(),
            backoff_ms: default_backoff_ms(),
            jobs: default_jobs(),
            format: OutputFormat::Table,
            builtin_models: true,
            models: Vec::new(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("listing-pipeline").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(database) = std::env::var("LISTING_DATABASE") {
            self.database = PathBuf::from(database);
        }

        if let Ok(currency) = std::env::var("LISTING_DEFAULT_CURRENCY") {
            self.normalizer.default_currency = currency;
        }

        if let Ok(attempts) = std::env::var("LISTING_MAX_ATTEMPTS") {
            if let Ok(n) = attempts.parse() {
                self.retry.max_attempts = n;
            }
        }

        if let Ok(jobs) = std::env::var("LISTING_JOBS") {
            if let Ok(n) = jobs.parse() {
                self.jobs = n;
            }
        }

        self
    }

    /// Builds the normalizer and the model registry. Fails fast on any
    /// inconsistent model or currency setting.
    pub fn registry(&self) -> Result<ModelRegistry, ConfigurationError> {
        let normalizer = Arc::new(Normalizer::new(self.normalizer.clone())?);

        let mut builder =
            RegistryBuilder::new(normalizer).discriminator_field(self.discriminator_field.clone());
        if self.builtin_models {
            builder = builder.builtins();
        }
        for spec in &self.models {
            builder = builder.spec(spec.clone());
        }

        builder.build()
    }
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use: table, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
