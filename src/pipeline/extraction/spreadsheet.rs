use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::{Deserialize, Serialize};

use super::confidence::{field_confidence, log_confidence};
use super::normalize::{digits_only, parse_decimal, parse_money};
use super::types::{CellValue, DocumentExtractor, ExtractionResult, SheetDecoder, SheetGrid};
use super::ExtractionError;
use crate::config::{CellBinding, PipelineConfig};
use crate::models::{ContractRecord, DocumentType};
use crate::pipeline::import::SourceFormat;

/// Canonical fields a spreadsheet cell can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SheetField {
    FullName,
    DocumentNumber,
    Email,
    Phone,
    ContractNumber,
    TotalAreaHectares,
    PricePerHectare,
    TotalValue,
}

impl SheetField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullName => "fullName",
            Self::DocumentNumber => "documentNumber",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::ContractNumber => "contractNumber",
            Self::TotalAreaHectares => "totalAreaHectares",
            Self::PricePerHectare => "pricePerHectare",
            Self::TotalValue => "totalValue",
        }
    }

    /// Write a cell into the record. Returns false when the value is unusable.
    fn apply(&self, cell: &CellValue, record: &mut ContractRecord) -> bool {
        let text = cell.as_text();
        match self {
            Self::FullName => record.full_name = Some(text),
            Self::Email => record.email = Some(text.to_lowercase()),
            Self::ContractNumber => record.contract_number = Some(text),
            Self::DocumentNumber => {
                let digits = digits_only(&text);
                if digits.is_empty() {
                    return false;
                }
                record.document_type = Some(DocumentType::from_digits(&digits));
                record.document_number = Some(digits);
            }
            Self::Phone => {
                let digits = digits_only(&text);
                if digits.is_empty() {
                    return false;
                }
                record.phone = Some(digits);
            }
            Self::TotalAreaHectares => {
                record.total_area_hectares = number(cell, parse_decimal);
                return record.total_area_hectares.is_some();
            }
            Self::PricePerHectare => {
                record.price_per_hectare = number(cell, parse_money_cell);
                return record.price_per_hectare.is_some();
            }
            Self::TotalValue => {
                record.total_value = number(cell, parse_money_cell);
                return record.total_value.is_some();
            }
        }
        true
    }
}

/// Numeric cells are taken as-is; text cells go through the Brazilian-notation parser.
fn number(cell: &CellValue, parse: impl Fn(&str) -> Option<f64>) -> Option<f64> {
    let value = match cell {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => parse(s),
        CellValue::Bool(_) => None,
    };
    value.filter(|v| *v > 0.0)
}

/// Money typed as text. Without a comma the cell is plain dot-decimal ("150.5").
fn parse_money_cell(raw: &str) -> Option<f64> {
    if raw.contains(',') {
        Some(parse_money(raw))
    } else {
        parse_decimal(raw)
    }
}

/// Workbook decoder backed by calamine (xlsx, xlsm, xls, ods).
pub struct CalamineSheetDecoder;

impl SheetDecoder for CalamineSheetDecoder {
    fn decode_first_sheet(&self, bytes: &[u8]) -> Result<SheetGrid, ExtractionError> {
        let cursor = Cursor::new(bytes.to_vec());
        let mut workbook = open_workbook_auto_from_rs(cursor)
            .map_err(|e| ExtractionError::SpreadsheetParsing(e.to_string()))?;

        let first = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(ExtractionError::EmptyWorkbook)?;
        let range = workbook
            .worksheet_range(&first)
            .map_err(|e| ExtractionError::SpreadsheetParsing(e.to_string()))?;

        let (row0, col0) = range.start().unwrap_or((0, 0));
        let mut grid = SheetGrid::new();
        for (r, row) in range.rows().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let value = match cell {
                    Data::String(s) => CellValue::Text(s.clone()),
                    Data::Float(f) => CellValue::Number(*f),
                    Data::Int(i) => CellValue::Number(*i as f64),
                    Data::Bool(b) => CellValue::Bool(*b),
                    Data::DateTime(d) => CellValue::Number(d.as_f64()),
                    Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
                    Data::Error(_) | Data::Empty => continue,
                };
                grid.insert(row0 + r as u32, col0 + c as u32, value);
            }
        }

        tracing::debug!(sheet = %first, "Decoded first worksheet");
        Ok(grid)
    }
}

/// Reads fixed cells from the first sheet, per the configured mapping.
pub struct SpreadsheetExtractor {
    decoder: Box<dyn SheetDecoder>,
    mapping: Vec<CellBinding>,
}

impl SpreadsheetExtractor {
    pub fn new(decoder: Box<dyn SheetDecoder>, config: &PipelineConfig) -> Self {
        Self {
            decoder,
            mapping: config.sheet_mapping.clone(),
        }
    }

    pub fn calamine(config: &PipelineConfig) -> Self {
        Self::new(Box::new(CalamineSheetDecoder), config)
    }

    fn try_extract(&self, bytes: &[u8]) -> Result<ExtractionResult, ExtractionError> {
        let grid = self.decoder.decode_first_sheet(bytes)?;
        let (record, matched, warnings) = map_cells(&grid, &self.mapping);

        if matched == 0 {
            return Err(ExtractionError::NothingRecognised);
        }

        let confidence = field_confidence(matched, self.mapping.len());
        log_confidence(SourceFormat::Spreadsheet.as_str(), confidence);
        tracing::info!(matched, expected = self.mapping.len(), confidence, "Spreadsheet extraction complete");
        Ok(ExtractionResult::succeeded(record, warnings, confidence))
    }
}

impl DocumentExtractor for SpreadsheetExtractor {
    fn format(&self) -> SourceFormat {
        SourceFormat::Spreadsheet
    }

    fn extract(&self, bytes: &[u8]) -> ExtractionResult {
        self.try_extract(bytes).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Spreadsheet extraction failed");
            ExtractionResult::from_error(&e)
        })
    }
}

/// Apply each binding to the grid. Returns the record, the number of
/// populated bindings, and a warning per blank or unusable cell.
pub fn map_cells(grid: &SheetGrid, mapping: &[CellBinding]) -> (ContractRecord, usize, Vec<String>) {
    let mut record = ContractRecord::default();
    let mut matched = 0;
    let mut warnings = Vec::new();

    for binding in mapping {
        let applied = grid
            .get(&binding.cell)
            .filter(|cell| !cell.is_blank())
            .is_some_and(|cell| binding.field.apply(cell, &mut record));
        if applied {
            matched += 1;
        } else {
            warnings.push(format!(
                "Field not found: {} (cell {})",
                binding.field.as_str(),
                binding.cell
            ));
        }
    }

    (record, matched, warnings)
}
