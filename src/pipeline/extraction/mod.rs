pub mod types;
pub mod confidence;
pub mod normalize;
pub mod pdf;
pub mod rules;
pub mod payments;
pub mod layers;
pub mod services;
pub mod text;
pub mod spreadsheet;
pub mod json;

pub use types::*;
pub use confidence::*;
pub use pdf::*;
pub use text::*;
pub use spreadsheet::{CalamineSheetDecoder, SpreadsheetExtractor};
pub use json::JsonProposalExtractor;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF decoder crashed: {0}")]
    DecoderPanic(String),

    #[error("Text encoding error: {0}")]
    EncodingError(String),

    #[error("Spreadsheet parsing failed: {0}")]
    SpreadsheetParsing(String),

    #[error("Spreadsheet has no sheets")]
    EmptyWorkbook,

    #[error("JSON parsing failed: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Document has no readable text")]
    EmptyDocument,

    #[error("No contract fields recognised")]
    NothingRecognised,
}
