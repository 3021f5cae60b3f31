//! Ingest command implementation.

use super::{Origin, RunReport};
use crate::config::Config;
use crate::feed;
use crate::format::Formatter;
use crate::pipeline::Pipeline;
use crate::store::{DatabaseManager, MemoryStore, SqliteStore};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Runs crawl feeds through the pipeline and persists the results.
pub struct IngestCommand {
    config: Config,
}

impl IngestCommand {
    /// Creates a new ingest command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Executes the ingest and returns formatted output.
    ///
    /// A dry run persists into a throwaway in-memory store.
    pub async fn execute(
        &self,
        paths: &[PathBuf],
        hint: Option<&str>,
        dry_run: bool,
    ) -> Result<String> {
        let store: Arc<dyn DatabaseManager> = if dry_run {
            Arc::new(MemoryStore::new())
        } else {
            let store = SqliteStore::open(&self.config.database).with_context(|| {
                format!("Failed to open database: {}", self.config.database.display())
            })?;
            Arc::new(store.with_backoff(Duration::from_millis(self.config.backoff_ms)))
        };

        let mut report = self.execute_with_store(store, paths, hint).await?;
        report.dry_run = dry_run;

        Ok(Formatter::new(self.config.format).format_report(&report))
    }

    /// Executes the ingest against a provided store (for testing).
    pub async fn execute_with_store(
        &self,
        store: Arc<dyn DatabaseManager>,
        paths: &[PathBuf],
        hint: Option<&str>,
    ) -> Result<RunReport> {
        let registry = self.config.registry().context("Invalid model configuration")?;
        let pipeline = Arc::new(Pipeline::new(Arc::new(registry), store, self.config.retry));
        let jobs = self.config.jobs.max(1);

        let mut report = RunReport::new("ingest");
        let mut tasks = JoinSet::new();

        for path in feed::discover(paths)? {
            let items = feed::read(&path)?;
            let feed_hint = hint.or_else(|| feed::infer_hint(&path)).map(str::to_string);
            let feed_name = path.display().to_string();
            info!("Ingesting {} items from {}", items.len(), feed_name);
            report.feeds += 1;

            for (index, item) in items.into_iter().enumerate() {
                while tasks.len() >= jobs {
                    if let Some(joined) = tasks.join_next().await {
                        let (origin, outcome) = joined.context("Pipeline task failed")?;
                        report.record(origin, outcome);
                    }
                }

                let pipeline = Arc::clone(&pipeline);
                let hint = feed_hint.clone();
                let origin = Origin { feed: feed_name.clone(), index };
                tasks.spawn(async move {
                    let outcome = pipeline.process(&item, hint.as_deref()).await;
                    (origin, outcome)
                });
            }
        }

        while let Some(joined) = tasks.join_next().await {
            let (origin, outcome) = joined.context("Pipeline task failed")?;
            report.record(origin, outcome);
        }

        // Tasks finish out of order
        report.failures.sort_by(|a, b| {
            (a.origin.feed.as_str(), a.origin.index).cmp(&(b.origin.feed.as_str(), b.origin.index))
        });

        debug!(
            "Ingest finished: {} persisted, {} dropped, {} retry pending",
            report.accepted, report.dropped, report.retry_pending
        );

        Ok(report)
    }
}
