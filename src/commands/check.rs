//! Check command implementation.

use super::{Origin, RunReport};
use crate::config::Config;
use crate::feed;
use crate::format::Formatter;
use crate::pipeline::Pipeline;
use crate::store::MemoryStore;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Resolves, normalizes and validates feeds without touching the database.
pub struct CheckCommand {
    config: Config,
}

impl CheckCommand {
    /// Creates a new check command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Executes the check and returns formatted output.
    pub fn execute(&self, paths: &[PathBuf], hint: Option<&str>) -> Result<String> {
        let report = self.run(paths, hint)?;
        Ok(Formatter::new(self.config.format).format_report(&report))
    }

    /// Builds the report without formatting.
    pub fn run(&self, paths: &[PathBuf], hint: Option<&str>) -> Result<RunReport> {
        let registry = self.config.registry().context("Invalid model configuration")?;
        // Validation never reaches the store
        let pipeline =
            Pipeline::new(Arc::new(registry), Arc::new(MemoryStore::new()), self.config.retry);

        let mut report = RunReport::new("check");
        report.dry_run = true;

        for path in feed::discover(paths)? {
            let items = feed::read(&path)?;
            let feed_hint = hint.or_else(|| feed::infer_hint(&path));
            let feed_name = path.display().to_string();
            info!("Checking {} items from {}", items.len(), feed_name);
            report.feeds += 1;

            for (index, item) in items.iter().enumerate() {
                let result = pipeline.validate(item, feed_hint).map(|_| ());
                report.record_check(Origin { feed: feed_name.clone(), index }, result);
            }
        }

        Ok(report)
    }
}
