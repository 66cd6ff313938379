use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ExtractionError;
use crate::models::ContractRecord;
use crate::pipeline::import::SourceFormat;

/// Outcome of running one extractor over one upload.
///
/// Extractors never fail by returning `Err`: decode and parse failures are
/// folded into `success: false` with the reasons in `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ContractRecord>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    /// 0..=100
    pub confidence: u8,
}

impl ExtractionResult {
    pub fn succeeded(data: ContractRecord, warnings: Vec<String>, confidence: u8) -> Self {
        Self {
            success: true,
            data: Some(data),
            errors: vec![],
            warnings,
            confidence: confidence.min(100),
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            errors,
            warnings: vec![],
            confidence: 0,
        }
    }

    pub fn from_error(err: &ExtractionError) -> Self {
        Self::failed(vec![err.to_string()])
    }
}

/// One source-specific extractor.
///
/// `extract` is total: every failure mode is reported inside the result.
pub trait DocumentExtractor: Send + Sync {
    fn format(&self) -> SourceFormat;
    fn extract(&self, bytes: &[u8]) -> ExtractionResult;
}

/// Turns document bytes into per-page text.
pub trait TextDecoder: Send + Sync {
    fn decode_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

/// Turns workbook bytes into the cells of its first sheet.
pub trait SheetDecoder: Send + Sync {
    fn decode_first_sheet(&self, bytes: &[u8]) -> Result<SheetGrid, ExtractionError>;
}

/// Scalar cell content.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    /// Cell rendered as text; whole numbers lose their trailing `.0`.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }

    /// Blank strings and `false` count as empty.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
            Self::Bool(b) => !b,
        }
    }
}

/// Sparse first-sheet contents keyed by zero-based (row, column).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    cells: HashMap<(u32, u32), CellValue>,
}

impl SheetGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, row: u32, col: u32, value: CellValue) {
        self.cells.insert((row, col), value);
    }

    /// Look up an A1-style address ("A2", "AB10").
    pub fn get(&self, address: &str) -> Option<&CellValue> {
        let (row, col) = parse_cell_address(address)?;
        self.cells.get(&(row, col))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// "A1" → (0, 0), "AA10" → (9, 26). Case-insensitive.
pub fn parse_cell_address(address: &str) -> Option<(u32, u32)> {
    let address = address.trim();
    let split = address.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = address.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        let value = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        col = col.checked_mul(26)?.checked_add(value)?;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}
