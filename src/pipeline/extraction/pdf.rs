use std::panic::{catch_unwind, AssertUnwindSafe};

use super::types::TextDecoder;
use super::ExtractionError;

/// PDF text decoder using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers; one string per page.
pub struct PdfTextDecoder;

impl TextDecoder for PdfTextDecoder {
    fn decode_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        // pdf-extract panics on some malformed inputs instead of returning Err
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }));

        match outcome {
            Ok(pages) => pages.map_err(|e| ExtractionError::PdfParsing(e.to_string())),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(error = %message, "pdf-extract panicked while decoding");
                Err(ExtractionError::DecoderPanic(message))
            }
        }
    }
}

/// Already-decoded UTF-8 text, treated as a single page.
pub struct PlainTextDecoder;

impl TextDecoder for PlainTextDecoder {
    fn decode_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ExtractionError::EncodingError(e.to_string()))?;
        Ok(vec![text.to_string()])
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
