use serde::Serialize;
use thiserror::Error;

use super::{merge_into, policy_for, MergePolicy};
use crate::models::ContractRecord;
use crate::pipeline::extraction::ExtractionResult;
use crate::pipeline::import::SourceFormat;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BatchError {
    /// Every uploaded file failed; one "file: reasons" entry per upload.
    #[error("{}", .messages.join("; "))]
    AllFailed { messages: Vec<String> },
}

/// Extraction outcome for one uploaded file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file_name: String,
    /// None when the format could not be detected.
    pub format: Option<SourceFormat>,
    pub result: ExtractionResult,
}

impl FileReport {
    /// "file: err1, err2"
    pub fn error_line(&self) -> String {
        format!("{}: {}", self.file_name, self.result.errors.join(", "))
    }
}

/// A scalar that a later file replaced with a different value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOverride {
    pub field: String,
    pub file_name: String,
}

/// Merged record of a batch with at least one successful file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub record: ContractRecord,
    pub files: Vec<FileReport>,
    /// Error lines of files that failed while others succeeded.
    pub errors: Vec<String>,
    pub overrides: Vec<FieldOverride>,
}

impl BatchOutcome {
    pub fn has_partial_failure(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Highest confidence among successful files.
    pub fn best_confidence(&self) -> u8 {
        self.files
            .iter()
            .filter(|f| f.result.success)
            .map(|f| f.result.confidence)
            .max()
            .unwrap_or(0)
    }

    /// Warnings of every file, prefixed with the file name.
    pub fn warnings(&self) -> Vec<String> {
        self.files
            .iter()
            .flat_map(|f| f.result.warnings.iter().map(move |w| format!("{}: {w}", f.file_name)))
            .collect()
    }
}

/// Merge per-file results in upload order.
///
/// At least one success yields the merged record, with the failures kept as
/// error lines. Zero successes among one or more files is an error that lists
/// every file. An empty batch is manual entry: an empty record.
pub fn merge_batch(files: Vec<FileReport>) -> Result<BatchOutcome, BatchError> {
    let mut record = ContractRecord::default();
    let mut errors = Vec::new();
    let mut overrides = Vec::new();
    let mut successes = 0;

    for file in &files {
        if !file.result.success {
            errors.push(file.error_line());
            continue;
        }
        let Some(data) = file.result.data.clone() else {
            continue;
        };
        successes += 1;

        for field in overridden_scalars(&record, &data) {
            tracing::debug!(field = %field, file = %file.file_name, "Later file overrides field");
            overrides.push(FieldOverride {
                field,
                file_name: file.file_name.clone(),
            });
        }
        merge_into(&mut record, data);
    }

    if successes == 0 && !files.is_empty() {
        tracing::warn!(files = files.len(), "Every file in the batch failed");
        return Err(BatchError::AllFailed { messages: errors });
    }

    if !errors.is_empty() {
        tracing::warn!(
            failed = errors.len(),
            total = files.len(),
            errors = ?errors,
            "Partial batch failure, continuing with successful files"
        );
    }

    Ok(BatchOutcome {
        record,
        files,
        errors,
        overrides,
    })
}

/// Later-wins fields that are defined on both sides with different values.
fn overridden_scalars(current: &ContractRecord, next: &ContractRecord) -> Vec<String> {
    let (Ok(serde_json::Value::Object(a)), Ok(serde_json::Value::Object(b))) =
        (serde_json::to_value(current), serde_json::to_value(next))
    else {
        return vec![];
    };

    b.iter()
        .filter(|(key, _)| policy_for(key) == Some(MergePolicy::LaterWins))
        .filter(|(key, value)| a.get(*key).is_some_and(|old| old != *value))
        .map(|(key, _)| key.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_report(name: &str, result: ExtractionResult) -> FileReport {
        FileReport {
            file_name: name.to_string(),
            format: Some(SourceFormat::Pdf),
            result,
        }
    }

    fn make_ok(name: &str, data: ContractRecord) -> FileReport {
        make_report(name, ExtractionResult::succeeded(data, vec!["Field not found: CEP".into()], 60))
    }

    fn make_failed(name: &str, errors: &[&str]) -> FileReport {
        make_report(
            name,
            ExtractionResult::failed(errors.iter().map(|e| e.to_string()).collect()),
        )
    }

    #[test]
    fn all_failed_lists_every_file() {
        let err = merge_batch(vec![
            make_failed("a.pdf", &["PDF parsing failed: x"]),
            make_failed("b.xlsx", &["Spreadsheet parsing failed: y", "z"]),
        ])
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("a.pdf"));
        assert!(message.contains("b.xlsx"));
        assert_eq!(
            message,
            "a.pdf: PDF parsing failed: x; b.xlsx: Spreadsheet parsing failed: y, z"
        );
    }

    #[test]
    fn partial_failure_keeps_successes() {
        let outcome = merge_batch(vec![
            make_failed("a.pdf", &["broken"]),
            make_ok(
                "b.json",
                ContractRecord {
                    full_name: Some("JOÃO".into()),
                    ..Default::default()
                },
            ),
        ])
        .unwrap();
        assert!(outcome.has_partial_failure());
        assert_eq!(outcome.errors, vec!["a.pdf: broken".to_string()]);
        assert_eq!(outcome.record.full_name.as_deref(), Some("JOÃO"));
        assert_eq!(outcome.best_confidence(), 60);
    }

    #[test]
    fn empty_batch_is_manual_entry() {
        let outcome = merge_batch(vec![]).unwrap();
        assert!(outcome.record.is_empty());
        assert!(!outcome.has_partial_failure());
    }

    #[test]
    fn overrides_reported_for_changed_scalars() {
        let outcome = merge_batch(vec![
            make_ok(
                "a.pdf",
                ContractRecord {
                    total_value: Some(100.0),
                    farm_name: Some("Boa Vista".into()),
                    ..Default::default()
                },
            ),
            make_ok(
                "b.json",
                ContractRecord {
                    total_value: Some(200.0),
                    farm_name: Some("Boa Vista".into()),
                    ..Default::default()
                },
            ),
        ])
        .unwrap();
        assert_eq!(
            outcome.overrides,
            vec![FieldOverride {
                field: "totalValue".into(),
                file_name: "b.json".into()
            }]
        );
        assert_eq!(outcome.record.total_value, Some(200.0));
    }

    #[test]
    fn warnings_prefixed_with_file_name() {
        let outcome = merge_batch(vec![make_ok("a.pdf", ContractRecord::default())]).unwrap();
        assert_eq!(outcome.warnings(), vec!["a.pdf: Field not found: CEP".to_string()]);
    }
}
