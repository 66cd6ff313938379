//! Extractor for proposal text (PDF or plain text).
//!
//! Runs the field rule table, the installment scanner, the layer table and
//! service inference over decoded text. Confidence is the share of expected
//! fields recovered; every missed field becomes a warning.

use std::sync::LazyLock;

use regex::Regex;

use super::confidence::{field_confidence, log_confidence};
use super::layers::extract_zoned_layers;
use super::payments::extract_payments;
use super::rules::{expected_text_fields, TEXT_RULES};
use super::services::{append_other_services, infer_services};
use super::types::{DocumentExtractor, ExtractionResult, TextDecoder};
use super::ExtractionError;
use crate::config::PipelineConfig;
use crate::models::ContractRecord;
use crate::pipeline::import::SourceFormat;

static PRODUCTS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)PRODUTOS\s+Nome\s+Descri[cç][aã]o\s+(.*?)(?:INVESTIMENTO|OUTROS\s+SERVI[CÇ]OS|$)")
        .expect("invalid products block regex")
});

static OTHER_SERVICES_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)OUTROS\s+SERVI[CÇ]OS\s+(.*?)(?:INVESTIMENTO|VALOR\s+TOTAL|PARCELAS|TESTEMUNHAS|OBSERVA[CÇ]|CONTRATANTE|$)")
        .expect("invalid other services regex")
});

static DISCOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Desconto\s*:?\s*(?:R\$\s*)?([\d.,]+\s*%?)").expect("invalid discount regex")
});

/// Text-based extractor. The decoder decides whether bytes are PDF or plain text.
pub struct UnstructuredTextExtractor {
    decoder: Box<dyn TextDecoder>,
    format: SourceFormat,
    min_payment_year: i32,
    max_pages: usize,
}

impl UnstructuredTextExtractor {
    pub fn new(decoder: Box<dyn TextDecoder>, format: SourceFormat, config: &PipelineConfig) -> Self {
        Self {
            decoder,
            format,
            min_payment_year: config.min_payment_year,
            max_pages: config.max_pdf_pages,
        }
    }

    pub fn pdf(config: &PipelineConfig) -> Self {
        Self::new(Box::new(super::pdf::PdfTextDecoder), SourceFormat::Pdf, config)
    }

    pub fn plain_text(config: &PipelineConfig) -> Self {
        Self::new(Box::new(super::pdf::PlainTextDecoder), SourceFormat::PlainText, config)
    }

    fn decode(&self, bytes: &[u8], warnings: &mut Vec<String>) -> Result<String, ExtractionError> {
        let pages = self.decoder.decode_pages(bytes)?;
        if pages.len() > self.max_pages {
            tracing::warn!(pages = pages.len(), max = self.max_pages, "Page cap reached");
            warnings.push(format!(
                "Only the first {} of {} pages were read",
                self.max_pages,
                pages.len()
            ));
        }
        let text = pages
            .into_iter()
            .take(self.max_pages)
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }
        Ok(text)
    }

    fn try_extract(&self, bytes: &[u8]) -> Result<ExtractionResult, ExtractionError> {
        let mut warnings = Vec::new();
        let text = self.decode(bytes, &mut warnings)?;
        let (record, matched, recovered_rows) =
            extract_from_text(&text, self.min_payment_year, &mut warnings);

        let any_service = record
            .services
            .as_ref()
            .is_some_and(|s| s.any_contracted());
        if matched == 0 && !recovered_rows && !any_service {
            return Err(ExtractionError::NothingRecognised);
        }

        let confidence = field_confidence(matched, expected_text_fields());
        log_confidence(self.format.as_str(), confidence);
        tracing::info!(
            format = self.format.as_str(),
            matched,
            expected = expected_text_fields(),
            confidence,
            "Text extraction complete"
        );
        Ok(ExtractionResult::succeeded(record, warnings, confidence))
    }
}

impl DocumentExtractor for UnstructuredTextExtractor {
    fn format(&self) -> SourceFormat {
        self.format
    }

    fn extract(&self, bytes: &[u8]) -> ExtractionResult {
        self.try_extract(bytes).unwrap_or_else(|e| {
            tracing::warn!(format = self.format.as_str(), error = %e, "Text extraction failed");
            ExtractionResult::from_error(&e)
        })
    }
}

/// Run every text rule over decoded text.
///
/// Returns the record, the number of expected fields recovered, and whether
/// any layer rows were found.
pub fn extract_from_text(
    text: &str,
    min_payment_year: i32,
    warnings: &mut Vec<String>,
) -> (ContractRecord, usize, bool) {
    let mut record = ContractRecord::default();
    let mut matched = 0;

    for rule in TEXT_RULES.iter() {
        if rule.apply(text, &mut record) {
            matched += 1;
        } else {
            warnings.push(format!("Field not found: {}", rule.field.label()));
        }
    }

    let payments = extract_payments(text, min_payment_year);
    if payments.is_empty() {
        warnings.push("Field not found: payment schedule".to_string());
    } else {
        matched += 1;
        record.payments = Some(payments);
    }

    if let Some(caps) = DISCOUNT.captures(text) {
        tracing::info!(discount = %caps[1].trim(), "Proposal lists a discount");
    }

    let products = PRODUCTS_BLOCK.captures(text).map(|c| c[1].to_string());
    let others = OTHER_SERVICES_BLOCK.captures(text).map(|c| c[1].to_string());

    let mut blocks: Vec<&str> = Vec::new();
    if let Some(p) = products.as_deref() {
        blocks.push(p);
    }
    if let Some(o) = others.as_deref() {
        blocks.push(o);
    }
    if blocks.is_empty() {
        blocks.push(text);
    }

    // Grid from the FAZENDAS table survives service inference
    let table_grid = record
        .services
        .as_ref()
        .and_then(|s| s.sampling_grid_size.clone());
    let mut services = infer_services(&blocks);
    if services.sampling_grid_size.is_none() {
        services.sampling_grid_size = table_grid;
    }
    if let Some(o) = others.as_deref() {
        let names: Vec<String> = o
            .lines()
            .flat_map(|line| line.split(';'))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        append_other_services(&mut services, &names);
    }
    record.services = Some(services);

    let layer_source = products.as_deref().unwrap_or(text);
    let zones = extract_zoned_layers(layer_source);
    let recovered_rows = !zones.is_empty();
    for (zone, rows) in zones {
        record.set_layers(zone, rows);
    }

    (record, matched, recovered_rows)
}
