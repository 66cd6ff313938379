//! BatchRunner: reads uploads, picks an extractor per file and merges.
//!
//! Files are processed strictly one at a time in upload order; the merge is
//! order-dependent, so there is no parallel fan-out.

use std::path::PathBuf;
use std::time::Instant;

use uuid::Uuid;

use super::batch::{merge_batch, BatchError, BatchOutcome, FileReport};
use crate::config::PipelineConfig;
use crate::pipeline::extraction::{
    DocumentExtractor, ExtractionResult, JsonProposalExtractor, SpreadsheetExtractor,
    UnstructuredTextExtractor,
};
use crate::pipeline::import::{check_size, detect_format, read_upload, SourceFormat, Upload};

pub struct BatchRunner {
    extractors: Vec<Box<dyn DocumentExtractor>>,
    config: PipelineConfig,
}

impl BatchRunner {
    pub fn new(extractors: Vec<Box<dyn DocumentExtractor>>, config: PipelineConfig) -> Self {
        Self { extractors, config }
    }

    /// Runner with the production extractor for every supported format.
    pub fn with_default_extractors(config: PipelineConfig) -> Self {
        let extractors: Vec<Box<dyn DocumentExtractor>> = vec![
            Box::new(UnstructuredTextExtractor::pdf(&config)),
            Box::new(UnstructuredTextExtractor::plain_text(&config)),
            Box::new(SpreadsheetExtractor::calamine(&config)),
            Box::new(JsonProposalExtractor),
        ];
        Self::new(extractors, config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract one in-memory upload. Never fails: problems land in the report.
    pub fn extract_upload(&self, upload: &Upload) -> FileReport {
        let start = Instant::now();

        if let Err(e) = check_size(upload.size_bytes(), self.config.max_file_size_bytes) {
            return report(upload, None, ExtractionResult::failed(vec![e.to_string()]));
        }

        let format = match detect_format(&upload.file_name, &upload.bytes) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(file = %upload.file_name, error = %e, "Format detection failed");
                return report(upload, None, ExtractionResult::failed(vec![e.to_string()]));
            }
        };

        let Some(extractor) = self.extractors.iter().find(|e| e.format() == format) else {
            tracing::debug!(format = format.as_str(), "No extractor registered for format");
            let error = format!("Formato não suportado: {}", format.as_str());
            return report(upload, Some(format), ExtractionResult::failed(vec![error]));
        };

        let result = extractor.extract(&upload.bytes);
        tracing::info!(
            file = %upload.file_name,
            format = format.as_str(),
            success = result.success,
            confidence = result.confidence,
            duration_ms = start.elapsed().as_millis() as u64,
            "File extracted"
        );
        report(upload, Some(format), result)
    }

    /// Extract and merge in-memory uploads, in order.
    pub fn run(&self, uploads: &[Upload]) -> Result<BatchOutcome, BatchError> {
        let batch_id = Uuid::new_v4();
        tracing::info!(%batch_id, files = uploads.len(), "Batch started");

        let reports = uploads.iter().map(|u| self.extract_upload(u)).collect();
        let outcome = merge_batch(reports);

        match &outcome {
            Ok(o) => tracing::info!(%batch_id, failed = o.errors.len(), "Batch merged"),
            Err(e) => tracing::warn!(%batch_id, error = %e, "Batch failed"),
        }
        outcome
    }

    /// Read files from disk one by one, then extract and merge them in order.
    pub async fn run_paths(&self, paths: &[PathBuf]) -> Result<BatchOutcome, BatchError> {
        let batch_id = Uuid::new_v4();
        tracing::info!(%batch_id, files = paths.len(), "Batch started");

        let mut reports = Vec::with_capacity(paths.len());
        for path in paths {
            let report = match read_upload(path, self.config.max_file_size_bytes).await {
                Ok(upload) => self.extract_upload(&upload),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Could not read upload");
                    FileReport {
                        file_name: display_name(path),
                        format: None,
                        result: ExtractionResult::failed(vec![e.to_string()]),
                    }
                }
            };
            reports.push(report);
        }

        let outcome = merge_batch(reports);
        if let Err(e) = &outcome {
            tracing::warn!(%batch_id, error = %e, "Batch failed");
        }
        outcome
    }
}

fn report(upload: &Upload, format: Option<SourceFormat>, result: ExtractionResult) -> FileReport {
    FileReport {
        file_name: upload.file_name.clone(),
        format,
        result,
    }
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContractRecord, Payment};
    use chrono::NaiveDate;

    /// Mock extractor that returns a canned result.
    struct MockExtractor {
        format: SourceFormat,
        result: ExtractionResult,
    }

    impl DocumentExtractor for MockExtractor {
        fn format(&self) -> SourceFormat {
            self.format
        }

        fn extract(&self, _bytes: &[u8]) -> ExtractionResult {
            self.result.clone()
        }
    }

    /// Mock extractor that answers with the record registered for the upload's content.
    struct KeyedExtractor {
        records: Vec<(&'static str, ContractRecord)>,
    }

    impl DocumentExtractor for KeyedExtractor {
        fn format(&self) -> SourceFormat {
            SourceFormat::Json
        }

        fn extract(&self, bytes: &[u8]) -> ExtractionResult {
            match self.records.iter().find(|(key, _)| key.as_bytes() == bytes) {
                Some((_, record)) => ExtractionResult::succeeded(record.clone(), vec![], 100),
                None => ExtractionResult::failed(vec!["unknown upload".into()]),
            }
        }
    }

    fn make_runner() -> BatchRunner {
        BatchRunner::with_default_extractors(PipelineConfig::default())
    }

    fn make_payment(number: u32, value: f64) -> Payment {
        Payment {
            number,
            due_date: NaiveDate::from_ymd_opt(2025, number, 10).unwrap(),
            value,
            status: None,
        }
    }

    fn make_keyed_runner() -> BatchRunner {
        let first = ContractRecord {
            full_name: Some("PRIMEIRO CLIENTE".into()),
            total_value: Some(100.0),
            payments: Some(vec![make_payment(1, 100.0)]),
            ..Default::default()
        };
        let second = ContractRecord {
            full_name: Some("SEGUNDO CLIENTE".into()),
            payments: Some(vec![]),
            ..Default::default()
        };
        let third = ContractRecord {
            total_value: Some(300.0),
            payments: Some(vec![make_payment(1, 150.0), make_payment(2, 150.0)]),
            ..Default::default()
        };
        BatchRunner::new(
            vec![Box::new(KeyedExtractor {
                records: vec![(r#"{"n":1}"#, first), (r#"{"n":2}"#, second), (r#"{"n":3}"#, third)],
            })],
            PipelineConfig::default(),
        )
    }

    fn make_upload(name: &str, key: &'static str) -> Upload {
        Upload::new(name, key)
    }

    #[test]
    fn routes_by_detected_format() {
        let runner = make_runner();
        let report = runner.extract_upload(&Upload::new("p.json", r#"{"cliente":"MARIA SOUZA"}"#));
        assert_eq!(report.format, Some(SourceFormat::Json));
        assert!(report.result.success);
        assert_eq!(
            report.result.data.unwrap().full_name.as_deref(),
            Some("MARIA SOUZA")
        );
    }

    #[test]
    fn unsupported_upload_reported_not_raised() {
        let runner = make_runner();
        let report = runner.extract_upload(&Upload::new("foto.png", vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0xFF]));
        assert!(!report.result.success);
        assert!(report.result.errors[0].starts_with("Formato não suportado"));
        assert_eq!(report.format, None);
    }

    #[test]
    fn missing_extractor_is_unsupported() {
        let runner = BatchRunner::new(vec![], PipelineConfig::default());
        let report = runner.extract_upload(&Upload::new("p.json", "{}"));
        assert!(!report.result.success);
        assert_eq!(report.format, Some(SourceFormat::Json));
    }

    #[test]
    fn oversized_upload_rejected_before_decoding() {
        let config = PipelineConfig {
            max_file_size_bytes: 4,
            ..Default::default()
        };
        let runner = BatchRunner::with_default_extractors(config);
        let report = runner.extract_upload(&Upload::new("p.json", r#"{"cliente":"X"}"#));
        assert!(!report.result.success);
        assert!(report.result.errors[0].starts_with("File too large"));
    }

    #[test]
    fn run_reports_files_in_upload_order() {
        let runner = BatchRunner::new(
            vec![Box::new(MockExtractor {
                format: SourceFormat::Json,
                result: ExtractionResult::succeeded(Default::default(), vec![], 100),
            })],
            PipelineConfig::default(),
        );
        let outcome = runner
            .run(&[Upload::new("a.json", "{}"), Upload::new("b.json", "{}")])
            .unwrap();
        let names: Vec<&str> = outcome.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn later_upload_wins_scalars() {
        let runner = make_keyed_runner();

        let outcome = runner
            .run(&[make_upload("a.json", r#"{"n":1}"#), make_upload("b.json", r#"{"n":2}"#)])
            .unwrap();
        assert_eq!(outcome.record.full_name.as_deref(), Some("SEGUNDO CLIENTE"));
        assert_eq!(outcome.record.total_value, Some(100.0));

        let reversed = runner
            .run(&[make_upload("b.json", r#"{"n":2}"#), make_upload("a.json", r#"{"n":1}"#)])
            .unwrap();
        assert_eq!(reversed.record.full_name.as_deref(), Some("PRIMEIRO CLIENTE"));
    }

    #[test]
    fn payments_replaced_only_by_non_empty_schedule() {
        let runner = make_keyed_runner();

        let kept = runner
            .run(&[make_upload("a.json", r#"{"n":1}"#), make_upload("b.json", r#"{"n":2}"#)])
            .unwrap();
        assert_eq!(kept.record.payments, Some(vec![make_payment(1, 100.0)]));

        let replaced = runner
            .run(&[
                make_upload("a.json", r#"{"n":1}"#),
                make_upload("b.json", r#"{"n":2}"#),
                make_upload("c.json", r#"{"n":3}"#),
            ])
            .unwrap();
        assert_eq!(replaced.record.total_value, Some(300.0));
        assert_eq!(
            replaced.record.payments,
            Some(vec![make_payment(1, 150.0), make_payment(2, 150.0)])
        );
    }

    #[tokio::test]
    async fn run_paths_reports_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("proposta.json");
        std::fs::write(&good, r#"{"cliente":"JOÃO DA SILVA"}"#).unwrap();
        let missing = dir.path().join("sumiu.pdf");

        let outcome = make_runner()
            .run_paths(&[missing, good])
            .await
            .unwrap();
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].starts_with("sumiu.pdf: "));
        assert_eq!(outcome.record.full_name.as_deref(), Some("JOÃO DA SILVA"));
    }

    #[tokio::test]
    async fn run_paths_all_failed() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("quebrado.json");
        std::fs::write(&bad, "{ not json").unwrap();

        let err = make_runner().run_paths(&[bad]).await.unwrap_err();
        assert!(err.to_string().starts_with("quebrado.json: JSON parsing failed"));
    }
}
