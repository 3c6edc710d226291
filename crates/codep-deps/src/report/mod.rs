//! Renderers for reconciliation results.

pub mod json;
pub mod markdown;
pub mod table;

pub use json::JsonFormatter;
pub use markdown::MarkdownFormatter;
pub use table::TableFormatter;

use crate::diff::VersionDiff;
use crate::engine::ReconciliationReport;
use crate::version::UpdateType;
use crate::Result;
use codep_config::OutputFormat;
use serde::Serialize;

/// Counts over a diff list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    /// Tracked packages
    pub total: usize,
    /// Packages the run would change
    pub outdated: usize,
    /// Outdated packages with a major move
    pub major: usize,
    /// Outdated packages with a minor move
    pub minor: usize,
    /// Outdated packages with a patch move
    pub patch: usize,
}

impl DiffSummary {
    /// One-line description, e.g. `3 packages, 1 outdated (1 major)`
    pub fn describe(&self) -> String {
        let mut line = format!(
            "{} package{}, {} outdated",
            self.total,
            if self.total == 1 { "" } else { "s" },
            self.outdated
        );
        let parts: Vec<String> = [
            (self.major, "major"),
            (self.minor, "minor"),
            (self.patch, "patch"),
        ]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{} {}", count, label))
        .collect();
        if !parts.is_empty() {
            line.push_str(&format!(" ({})", parts.join(", ")));
        }
        line
    }
}

/// Count outdated packages by severity
pub fn summarize(diffs: &[VersionDiff]) -> DiffSummary {
    diffs
        .iter()
        .fold(DiffSummary { total: diffs.len(), ..Default::default() }, |mut summary, diff| {
            if diff.will_update {
                summary.outdated += 1;
                match diff.severity() {
                    UpdateType::Major => summary.major += 1,
                    UpdateType::Minor => summary.minor += 1,
                    UpdateType::Patch => summary.patch += 1,
                    UpdateType::None => {}
                }
            }
            summary
        })
}

/// Status label for one diff row
pub(crate) fn row_status(diff: &VersionDiff) -> &'static str {
    if diff.will_update {
        "update"
    } else if diff.is_pinned {
        "pinned"
    } else {
        "current"
    }
}

/// Trait for rendering reconciliation results
pub trait ReportFormatter {
    /// Render the report as text
    fn render(&self, report: &ReconciliationReport) -> Result<String>;
}

/// Formatter for an output format
pub fn formatter_for(format: OutputFormat) -> Box<dyn ReportFormatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

/// Render `report` in `format`
pub fn render_report(format: OutputFormat, report: &ReconciliationReport) -> Result<String> {
    formatter_for(format).render(report)
}
