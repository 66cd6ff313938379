use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::extraction::spreadsheet::SheetField;

/// Application-level constants
pub const APP_NAME: &str = "Agrocontract";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upload size cap applied before any decoding.
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024; // 100MB

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "agrocontract=info"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Binds one canonical field to a fixed spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellBinding {
    pub field: SheetField,
    /// A1-style address on the first sheet.
    pub cell: String,
}

impl CellBinding {
    fn new(field: SheetField, cell: &str) -> Self {
        Self {
            field,
            cell: cell.to_string(),
        }
    }
}

/// Tunables for the extraction pipeline.
///
/// Every field has a default, so a config file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Installment dates before this year are treated as false positives.
    pub min_payment_year: i32,
    pub max_file_size_bytes: u64,
    /// Pages past this index are not decoded.
    pub max_pdf_pages: usize,
    pub sheet_mapping: Vec<CellBinding>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_payment_year: 2000,
            max_file_size_bytes: MAX_FILE_SIZE,
            max_pdf_pages: 50,
            sheet_mapping: default_sheet_mapping(),
        }
    }
}

impl PipelineConfig {
    /// Load overrides from a JSON file on top of the defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "Loaded pipeline config");
        Ok(config)
    }
}

/// Header row in row 1, values in row 2.
pub fn default_sheet_mapping() -> Vec<CellBinding> {
    vec![
        CellBinding::new(SheetField::FullName, "A2"),
        CellBinding::new(SheetField::DocumentNumber, "B2"),
        CellBinding::new(SheetField::Email, "C2"),
        CellBinding::new(SheetField::Phone, "D2"),
        CellBinding::new(SheetField::ContractNumber, "E2"),
        CellBinding::new(SheetField::TotalAreaHectares, "F2"),
        CellBinding::new(SheetField::PricePerHectare, "G2"),
        CellBinding::new(SheetField::TotalValue, "H2"),
    ]
}
