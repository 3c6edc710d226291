//! Markdown formatter, suitable for pull request comments.

use super::{row_status, summarize, ReportFormatter};
use crate::engine::ReconciliationReport;
use crate::Result;

/// Markdown table output
pub struct MarkdownFormatter;

impl ReportFormatter for MarkdownFormatter {
    fn render(&self, report: &ReconciliationReport) -> Result<String> {
        let summary = summarize(&report.diffs);
        let mut out = String::from("## Dependency Versions\n\n");
        out.push_str(&format!(
            "**Status:** {} | {}\n\n",
            report.verdict.as_str(),
            summary.describe()
        ));

        if report.diffs.is_empty() {
            out.push_str("_No tracked dependencies found._\n");
            return Ok(out);
        }

        out.push_str("| Package | Current | Latest | Severity | Status |\n");
        out.push_str("|---------|---------|--------|----------|--------|\n");
        for diff in &report.diffs {
            out.push_str(&format!(
                "| `{}` | {} | {} | {} | {} |\n",
                diff.package,
                diff.current,
                diff.latest,
                diff.severity().as_str(),
                row_status(diff)
            ));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::{diff, report};

    #[test]
    fn test_markdown_table() {
        let rendered = MarkdownFormatter
            .render(&report(vec![
                diff("react", "^17.0.2", "18.2.0", true),
                diff("lodash", "4.17.21", "4.17.21", false),
            ]))
            .unwrap();

        assert!(rendered.starts_with("## Dependency Versions\n"));
        assert!(rendered.contains("**Status:** outdated | 2 packages, 1 outdated (1 major)"));
        assert!(rendered.contains("| `react` | ^17.0.2 | 18.2.0 | major | update |"));
        assert!(rendered.contains("| `lodash` | 4.17.21 | 4.17.21 | none | pinned |"));
    }

    #[test]
    fn test_markdown_empty() {
        let rendered = MarkdownFormatter.render(&report(vec![])).unwrap();
        assert!(rendered.contains("_No tracked dependencies found._"));
        assert!(!rendered.contains("| Package |"));
    }
}
