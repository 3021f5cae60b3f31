//! Output formatting for run reports, kinds and counts (table, JSON).

use crate::commands::RunReport;
use crate::config::OutputFormat;
use serde::Serialize;

/// Maximum failures listed in table output.
const MAX_TABLE_FAILURES: usize = 20;

/// One registered model, as shown by `kinds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindSummary {
    pub kind: String,
    pub matches: Vec<String>,
    pub required: Vec<String>,
    pub key: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_field: Option<String>,
}

#[derive(Serialize)]
struct CountOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
    count: u64,
}

/// Formats command results for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the summary of an ingest or check run.
    pub fn format_report(&self, report: &RunReport) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Table => self.table_report(report),
        }
    }

    /// Formats the registered models.
    pub fn format_kinds(&self, kinds: &[KindSummary]) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(kinds).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Table if kinds.is_empty() => "No models registered.".to_string(),
            OutputFormat::Table => self.table_kinds(kinds),
        }
    }

    /// Formats an entity count.
    pub fn format_count(&self, kind: Option<&str>, count: u64) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&CountOutput { kind, count })
                .unwrap_or_else(|_| "{}".to_string()),
            OutputFormat::Table => format!("{}: {}", kind.unwrap_or("all kinds"), count),
        }
    }

    // Table formatting

    fn table_report(&self, report: &RunReport) -> String {
        let accepted_label = if report.command == "check" { "Valid" } else { "Persisted" };

        let mut lines = Vec::new();
        if report.dry_run && report.command != "check" {
            lines.push("Dry run: nothing was written to the database".to_string());
            lines.push(String::new());
        }

        lines.push(format!("{:<15}{}", "Feeds:", report.feeds));
        lines.push(format!("{:<15}{}", "Items:", report.items));
        lines.push(format!("{:<15}{}", format!("{}:", accepted_label), report.accepted));
        lines.push(format!("{:<15}{}", "Dropped:", report.dropped));
        if report.retry_pending > 0 {
            lines.push(format!("{:<15}{}", "Retry pending:", report.retry_pending));
        }

        if !report.reasons.is_empty() {
            let code_width = 24;
            lines.push(String::new());
            lines.push(format!("{:<code_width$}  {}", "Reason", "Count"));
            lines.push(format!("{:-<code_width$}  {:-<5}", "", ""));
            for (code, count) in &report.reasons {
                lines.push(format!("{:<code_width$}  {:>5}", code, count));
            }
        }

        if !report.failures.is_empty() {
            lines.push(String::new());
            lines.push("Failures:".to_string());
            for failure in report.failures.iter().take(MAX_TABLE_FAILURES) {
                lines.push(format!(
                    "  {}#{}  {}",
                    failure.origin.feed, failure.origin.index, failure.failure
                ));
            }
            let hidden = report.failures.len().saturating_sub(MAX_TABLE_FAILURES);
            if hidden > 0 {
                lines.push(format!("  ... and {} more (use --format json for all)", hidden));
            }
        }

        lines.join("\n")
    }

    fn table_kinds(&self, kinds: &[KindSummary]) -> String {
        let kind_width = kinds.iter().map(|k| k.kind.len()).max().unwrap_or(0).max(4);
        let match_width = 28;
        let required_width = 16;

        let mut lines = Vec::new();
        lines.push(format!(
            "{:<kind_width$}  {:<match_width$}  {:<required_width$}  {}",
            "Kind", "Matches", "Required", "Key"
        ));
        lines.push(format!(
            "{:-<kind_width$}  {:-<match_width$}  {:-<required_width$}  {:-<10}",
            "", "", "", ""
        ));

        for k in kinds {
            let key = if k.key.is_empty() { "(fingerprint)".to_string() } else { k.key.join(", ") };
            lines.push(format!(
                "{:<kind_width$}  {:<match_width$}  {:<required_width$}  {}",
                k.kind,
                k.matches.join(", "),
                k.required.join(", "),
                key
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} kinds", kinds.len()));

        lines.join("\n")
    }
}
