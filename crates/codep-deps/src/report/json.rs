//! JSON formatter for reconciliation results.

use super::{summarize, ReportFormatter};
use crate::engine::ReconciliationReport;
use crate::Result;
use serde_json::{json, Value};

/// Machine-readable output
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn render(&self, report: &ReconciliationReport) -> Result<String> {
        let dependencies = report
            .diffs
            .iter()
            .map(|diff| -> Result<Value> {
                let mut entry = serde_json::to_value(diff)?;
                if let Some(obj) = entry.as_object_mut() {
                    obj.insert("severity".to_string(), json!(diff.severity()));
                }
                Ok(entry)
            })
            .collect::<Result<Vec<_>>>()?;

        let output = json!({
            "status": report.verdict.as_str(),
            "exitCode": report.verdict.exit_code(),
            "summary": summarize(&report.diffs),
            "dependencies": dependencies,
        });

        Ok(serde_json::to_string_pretty(&output)?)
    }
}
