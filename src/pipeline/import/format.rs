use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ImportError;

/// Source formats the pipeline can extract from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Proposal PDF, decoded to text.
    Pdf,
    /// Already-decoded proposal text.
    PlainText,
    /// Workbook with values at fixed cells.
    Spreadsheet,
    /// Pre-structured proposal JSON.
    Json,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::PlainText => "plain_text",
            Self::Spreadsheet => "spreadsheet",
            Self::Json => "json",
        }
    }

    /// Map a lowercase file extension to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "txt" | "text" => Some(Self::PlainText),
            "xlsx" | "xlsm" | "xls" | "ods" => Some(Self::Spreadsheet),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Detect the source format of an upload.
///
/// Binary containers are recognised by magic bytes first; extensions can be
/// wrong. Text formats have no reliable signature, so JSON and plain text fall
/// back to the extension, then to a sniff of the first non-blank character.
/// Extensions outside the supported set are rejected without sniffing.
pub fn detect_format(file_name: &str, bytes: &[u8]) -> Result<SourceFormat, ImportError> {
    if bytes.is_empty() {
        return Err(ImportError::EmptyFile(file_name.to_string()));
    }

    match &bytes[..bytes.len().min(8)] {
        // PDF: starts with %PDF
        [0x25, 0x50, 0x44, 0x46, ..] => return Ok(SourceFormat::Pdf),
        // ZIP container (xlsx, ods): PK\x03\x04
        [0x50, 0x4B, 0x03, 0x04, ..] => {
            return match extension_of(file_name).as_deref() {
                Some("xlsx" | "xlsm" | "ods") | None => Ok(SourceFormat::Spreadsheet),
                Some(other) => Err(ImportError::UnsupportedFormat(format!(
                    "{file_name} (zip archive with .{other} extension)"
                ))),
            };
        }
        // OLE2 compound file (legacy xls)
        [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1] => return Ok(SourceFormat::Spreadsheet),
        _ => {}
    }

    let extension = extension_of(file_name);
    let claimed = extension.as_deref().map(SourceFormat::from_extension);
    match claimed {
        // Unknown extensions (images, documents) are never sniffed
        Some(None) => return Err(ImportError::UnsupportedFormat(file_name.to_string())),
        Some(Some(format @ (SourceFormat::Json | SourceFormat::PlainText))) => return Ok(format),
        // A .pdf or spreadsheet extension without the matching signature is not trusted
        Some(Some(_)) | None => {}
    }

    if is_likely_text(bytes) {
        let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
        if first == Some(&b'{') {
            return Ok(SourceFormat::Json);
        }
        return Ok(SourceFormat::PlainText);
    }

    Err(ImportError::UnsupportedFormat(file_name.to_string()))
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Valid UTF-8 on the first chunk and mostly printable.
fn is_likely_text(bytes: &[u8]) -> bool {
    let chunk = &bytes[..bytes.len().min(4096)];
    let text = match std::str::from_utf8(chunk) {
        Ok(t) => t,
        // A multi-byte char may be cut at the chunk boundary
        Err(e) if e.error_len().is_none() => match std::str::from_utf8(&chunk[..e.valid_up_to()]) {
            Ok(t) => t,
            Err(_) => return false,
        },
        Err(_) => return false,
    };

    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let printable = text
        .chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .count();
    printable as f64 / total as f64 > 0.80
}

/// Sanitize a filename: strip path components, limit length.
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .take(255)
        .collect();

    if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_detected_from_magic_bytes() {
        let format = detect_format("proposta.pdf", b"%PDF-1.4 rest of file").unwrap();
        assert_eq!(format, SourceFormat::Pdf);
    }

    #[test]
    fn pdf_magic_wins_over_extension() {
        let format = detect_format("proposta.txt", b"%PDF-1.7\n...").unwrap();
        assert_eq!(format, SourceFormat::Pdf);
    }

    #[test]
    fn xlsx_detected_from_zip_signature() {
        let bytes = [0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x06, 0x00];
        assert_eq!(detect_format("dados.xlsx", &bytes).unwrap(), SourceFormat::Spreadsheet);
    }

    #[test]
    fn zip_with_foreign_extension_unsupported() {
        let bytes = [0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x06, 0x00];
        assert!(matches!(
            detect_format("arquivo.docx", &bytes),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn legacy_xls_detected_from_ole_signature() {
        let bytes = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00];
        assert_eq!(detect_format("antigo.xls", &bytes).unwrap(), SourceFormat::Spreadsheet);
    }

    #[test]
    fn json_by_extension() {
        let format = detect_format("proposta.json", br#"{"cliente": "X"}"#).unwrap();
        assert_eq!(format, SourceFormat::Json);
    }

    #[test]
    fn json_sniffed_without_extension() {
        let format = detect_format("export", b"  \n{\"cliente\": 1}").unwrap();
        assert_eq!(format, SourceFormat::Json);
    }

    #[test]
    fn text_file_detected() {
        let format = detect_format("proposta.txt", "Cliente: JOÃO SILVA".as_bytes()).unwrap();
        assert_eq!(format, SourceFormat::PlainText);
    }

    #[test]
    fn fake_pdf_extension_falls_back_to_content() {
        let format = detect_format("misleading.pdf", b"just some words").unwrap();
        assert_eq!(format, SourceFormat::PlainText);
    }

    #[test]
    fn binary_is_unsupported() {
        let result = detect_format("program.exe", &[0x4D, 0x5A, 0x90, 0x00, 0x03, 0x00, 0x00, 0x01]);
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn unknown_extension_not_sniffed() {
        let result = detect_format("notas.docx", b"Cliente: JOAO");
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn empty_upload_rejected() {
        assert!(matches!(detect_format("vazio.pdf", b""), Err(ImportError::EmptyFile(_))));
    }

    #[test]
    fn unsupported_message_is_portuguese() {
        let err = ImportError::UnsupportedFormat("foto.png".into());
        assert_eq!(err.to_string(), "Formato não suportado: foto.png");
    }

    #[test]
    fn format_as_str_roundtrip_through_extension() {
        assert_eq!(SourceFormat::from_extension("ods"), Some(SourceFormat::Spreadsheet));
        assert_eq!(SourceFormat::from_extension("png"), None);
        assert_eq!(SourceFormat::Pdf.to_string(), "pdf");
    }

    #[test]
    fn sanitize_path_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("proposta_291.pdf"), "proposta_291.pdf");
        assert_eq!(sanitize_filename(""), "document");
        assert_eq!(sanitize_filename("file\0name.pdf"), "filename.pdf");
    }
}
