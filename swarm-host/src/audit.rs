//! Batch validation of contract files and sources.
//!
//! Every file and record is checked independently; a broken file shows up in
//! its own report and never stops the batch.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use agent_kernel::{ContractFilter, ContractSource, RegistryResult};
use agent_primitives::{ContractRecord, Violation};
use agent_validator::{ContractValidator, ValidationReport};
use serde_json::Value;

/// Reports for every record found in one file or source.
#[derive(Debug, Clone)]
pub struct FileReport {
    /// Where the records came from.
    pub origin: PathBuf,
    /// One report per record, in order.
    pub reports: Vec<ValidationReport>,
}

impl FileReport {
    /// Returns `true` when every record is valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.reports.iter().all(ValidationReport::is_valid)
    }

    /// Renders the per-record findings as text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let status = if self.is_valid() { "ok" } else { "FAILED" };
        let _ = writeln!(out, "{}: {status}", self.origin.display());
        for (index, report) in self.reports.iter().enumerate() {
            let id = report.record_id().unwrap_or("<unknown>");
            for error in report.errors() {
                let _ = writeln!(out, "  [{index}] {id} error: {error}");
            }
            for warning in report.warnings() {
                let _ = writeln!(out, "  [{index}] {id} warning: {warning}");
            }
        }
        out
    }
}

/// Totals across a batch of files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditSummary {
    /// Records checked.
    pub total: usize,
    /// Records without errors.
    pub valid: usize,
    /// Errors reported.
    pub errors: usize,
    /// Warnings reported.
    pub warnings: usize,
}

impl AuditSummary {
    /// Sums the findings of `files`.
    #[must_use]
    pub fn of(files: &[FileReport]) -> Self {
        files
            .iter()
            .flat_map(|file| &file.reports)
            .fold(Self::default(), |mut summary, report| {
                summary.total += 1;
                summary.valid += usize::from(report.is_valid());
                summary.errors += report.errors().len();
                summary.warnings += report.warnings().len();
                summary
            })
    }

    /// Returns `true` when no record failed.
    #[must_use]
    pub const fn all_valid(&self) -> bool {
        self.total == self.valid
    }
}

impl std::fmt::Display for AuditSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "total: {}, valid: {}, errors: {}, warnings: {}",
            self.total, self.valid, self.errors, self.warnings
        )
    }
}

/// Validates JSON text holding one record or an array of records.
#[must_use]
pub fn validate_text(validator: &ContractValidator, text: &str) -> Vec<ValidationReport> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items.into_iter().map(|item| validate_value(validator, item)).collect(),
        Ok(value) => vec![validate_value(validator, value)],
        Err(err) => vec![ValidationReport::unreadable(Violation::parse(err.to_string()))],
    }
}

fn validate_value(validator: &ContractValidator, value: Value) -> ValidationReport {
    match ContractRecord::from_value(value) {
        Some(record) => validator.validate(&record),
        None => ValidationReport::unreadable(Violation::parse("contract must be a JSON object")),
    }
}

/// Validates each file in `paths`.
pub async fn validate_files(validator: &ContractValidator, paths: &[PathBuf]) -> Vec<FileReport> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let reports = match tokio::fs::read_to_string(path).await {
            Ok(text) => validate_text(validator, &text),
            Err(err) => vec![ValidationReport::unreadable(Violation::parse(format!(
                "failed to read file: {err}"
            )))],
        };
        files.push(FileReport {
            origin: path.clone(),
            reports,
        });
    }
    files
}

/// Lists the `.json` files directly inside `dir`, sorted.
///
/// # Errors
///
/// Returns the I/O error when the directory cannot be read.
pub async fn json_files_in(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") && entry.file_type().await?.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Validates every record a source returns, regardless of status.
///
/// # Errors
///
/// Returns the registry error when a page cannot be fetched.
pub async fn validate_source(
    validator: &ContractValidator,
    source: &dyn ContractSource,
    origin: impl Into<PathBuf>,
    page_size: usize,
) -> RegistryResult<FileReport> {
    let filter = ContractFilter::default().with_page_size(page_size);
    let mut reports = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = source.query(&filter, cursor.as_deref()).await?;
        reports.extend(page.records.iter().map(|record| validator.validate(record)));
        match page.next_cursor {
            Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
            _ => break,
        }
    }
    Ok(FileReport {
        origin: origin.into(),
        reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_kernel::InMemorySource;
    use serde_json::json;

    fn valid_record(id: &str) -> Value {
        json!({
            "AgentID": id,
            "Name": format!("Agent {id}"),
            "Role": "Specialist",
            "Category": "Research",
            "AutonomyLevel": "Level 3 - Autonomous",
            "ExecutionPattern": "Sequential",
            "MCPEnabled": true,
            "ToolSchema": "{\"input\":{\"topic\":{\"type\":\"string\"}},\"output\":{\"format\":\"markdown\"}}",
            "QualityScore": 0.9,
            "Status": "Active",
            "Architectures": ["MCP-Swarm"]
        })
    }

    #[test]
    fn arrays_yield_one_report_per_record() {
        let validator = ContractValidator::default();
        let mut broken = valid_record("b");
        broken["QualityScore"] = json!(1.5);
        let text = json!([valid_record("a"), broken, 7]).to_string();

        let reports = validate_text(&validator, &text);
        assert_eq!(reports.len(), 3);
        assert!(reports[0].is_valid());
        assert_eq!(reports[1].errors().len(), 1);
        assert_eq!(reports[1].errors()[0].path(), "QualityScore");
        assert_eq!(reports[2].errors()[0].path(), "root");
    }

    #[test]
    fn unparseable_text_is_a_root_violation() {
        let reports = validate_text(&ContractValidator::default(), "{ nope");
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].errors()[0].path(), "root");
    }

    #[tokio::test]
    async fn unreadable_file_does_not_stop_the_batch() {
        let dir = std::env::temp_dir().join(format!("swarm-audit-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let good = dir.join("a.json");
        tokio::fs::write(&good, valid_record("a").to_string()).await.unwrap();
        tokio::fs::write(dir.join("notes.txt"), "ignored").await.unwrap();

        let mut paths = json_files_in(&dir).await.unwrap();
        assert_eq!(paths, vec![good.clone()]);
        paths.push(dir.join("missing.json"));

        let files = validate_files(&ContractValidator::default(), &paths).await;
        assert!(files[0].is_valid());
        assert!(!files[1].is_valid());

        let summary = AuditSummary::of(&files);
        assert_eq!(summary, AuditSummary { total: 2, valid: 1, errors: 1, warnings: 0 });
        assert!(!summary.all_valid());
        assert!(files[1].render().contains("FAILED"));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn source_records_are_validated_across_pages() {
        let records = ["a", "b", "c"]
            .iter()
            .map(|id| ContractRecord::from_value(valid_record(id)).unwrap())
            .collect();
        let source = InMemorySource::new(records);

        let file = validate_source(&ContractValidator::default(), &source, "memory", 2)
            .await
            .unwrap();
        assert_eq!(file.reports.len(), 3);
        assert!(file.is_valid());
    }
}
