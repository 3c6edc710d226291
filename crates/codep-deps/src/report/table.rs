//! Box-drawn terminal table.

use super::{row_status, summarize, ReportFormatter};
use crate::diff::VersionDiff;
use crate::engine::{ReconciliationReport, Verdict};
use crate::version::UpdateType;
use crate::Result;
use colored::*;
use regex::Regex;
use std::sync::LazyLock;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid ANSI escape regex"));

const HEADERS: [&str; 5] = ["Package", "Current", "Latest", "Severity", "Status"];

/// Remove terminal color codes
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Printed width of `text`, ignoring color codes
fn visible_width(text: &str) -> usize {
    strip_ansi(text).chars().count()
}

fn pad(cell: &str, width: usize) -> String {
    let padding = width.saturating_sub(visible_width(cell));
    format!("{}{}", cell, " ".repeat(padding))
}

fn border(left: &str, join: &str, right: &str, widths: &[usize]) -> String {
    let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
    format!("{}{}{}", left, segments.join(join), right)
}

fn row(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!(" {} ", pad(cell, *width)))
        .collect();
    format!("│{}│", padded.join("│"))
}

fn severity_cell(severity: UpdateType) -> String {
    match severity {
        UpdateType::Major => severity.as_str().red().bold().to_string(),
        UpdateType::Minor => severity.as_str().yellow().to_string(),
        UpdateType::Patch => severity.as_str().green().to_string(),
        UpdateType::None => severity.as_str().dimmed().to_string(),
    }
}

fn status_cell(diff: &VersionDiff) -> String {
    let status = row_status(diff);
    if diff.will_update {
        status.yellow().bold().to_string()
    } else {
        status.green().to_string()
    }
}

/// Terminal table output
pub struct TableFormatter;

impl ReportFormatter for TableFormatter {
    fn render(&self, report: &ReconciliationReport) -> Result<String> {
        let summary = summarize(&report.diffs);
        let verdict = match report.verdict {
            Verdict::UpToDate => report.verdict.as_str().green().bold(),
            Verdict::Updated => report.verdict.as_str().cyan().bold(),
            Verdict::Outdated => report.verdict.as_str().red().bold(),
        };

        if report.diffs.is_empty() {
            return Ok(format!(
                "No tracked dependencies found.\n{}: {}\n",
                verdict,
                summary.describe()
            ));
        }

        let header: Vec<String> = HEADERS.iter().map(|h| h.bold().to_string()).collect();
        let rows: Vec<Vec<String>> = report
            .diffs
            .iter()
            .map(|diff| {
                vec![
                    diff.package.clone(),
                    diff.current.clone(),
                    diff.latest.clone(),
                    severity_cell(diff.severity()),
                    status_cell(diff),
                ]
            })
            .collect();

        let widths: Vec<usize> = (0..HEADERS.len())
            .map(|col| {
                std::iter::once(&header)
                    .chain(&rows)
                    .map(|cells| visible_width(&cells[col]))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut lines = vec![
            border("┌", "┬", "┐", &widths),
            row(&header, &widths),
            border("├", "┼", "┤", &widths),
        ];
        lines.extend(rows.iter().map(|cells| row(cells, &widths)));
        lines.push(border("└", "┴", "┘", &widths));
        lines.push(format!("{}: {}", verdict, summary.describe()));

        Ok(lines.join("\n") + "\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::{diff, report};

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[1;31mmajor\x1b[0m"), "major");
        assert_eq!(visible_width("\x1b[32mok\x1b[0m"), 2);
    }

    #[test]
    fn test_table_layout() {
        let rendered = TableFormatter
            .render(&report(vec![
                diff("react", "^17.0.2", "18.2.0", true),
                diff("lodash", "4.17.21", "4.17.21", false),
            ]))
            .unwrap();
        let plain = strip_ansi(&rendered);
        let lines: Vec<&str> = plain.lines().collect();

        assert!(lines[0].starts_with('┌') && lines[0].ends_with('┐'));
        assert!(lines[1].contains("Package") && lines[1].contains("Status"));
        assert!(lines[3].contains("react") && lines[3].contains("update"));
        assert!(lines[4].contains("lodash") && lines[4].contains("pinned"));
        assert!(lines[5].starts_with('└'));
        assert_eq!(lines[6], "outdated: 2 packages, 1 outdated (1 major)");

        let widths: Vec<usize> = lines[..6].iter().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_table_empty() {
        let rendered = strip_ansi(&TableFormatter.render(&report(vec![])).unwrap());
        assert_eq!(
            rendered,
            "No tracked dependencies found.\nup-to-date: 0 packages, 0 outdated\n"
        );
    }
}
