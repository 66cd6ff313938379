use std::path::Path;

use super::format::sanitize_filename;
use super::ImportError;

/// One uploaded file held in memory.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: sanitize_filename(file_name),
            bytes: bytes.into(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Reject uploads over the configured size cap.
pub fn check_size(size_bytes: u64, max_bytes: u64) -> Result<(), ImportError> {
    if size_bytes > max_bytes {
        return Err(ImportError::FileTooLarge {
            size_mb: size_bytes as f64 / (1024.0 * 1024.0),
            max_mb: max_bytes / (1024 * 1024),
        });
    }
    Ok(())
}

/// Read a file from disk, checking its size before loading it.
pub async fn read_upload(path: &Path, max_bytes: u64) -> Result<Upload, ImportError> {
    let metadata = tokio::fs::metadata(path).await?;
    check_size(metadata.len(), max_bytes)?;

    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    tracing::debug!(file = %file_name, size = bytes.len(), "Upload read");
    Ok(Upload::new(&file_name, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_file_and_sanitizes_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proposta.txt");
        std::fs::write(&path, "Cliente: JOÃO").unwrap();

        let upload = read_upload(&path, 1024).await.unwrap();
        assert_eq!(upload.file_name, "proposta.txt");
        assert_eq!(upload.bytes, "Cliente: JOÃO".as_bytes());
    }

    #[tokio::test]
    async fn oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.pdf");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(2 * 1024 * 1024).unwrap();

        let result = read_upload(&path, 1024 * 1024).await;
        assert!(matches!(result, Err(ImportError::FileTooLarge { max_mb: 1, .. })));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let result = read_upload(Path::new("/nonexistent/proposta.pdf"), 1024).await;
        assert!(matches!(result, Err(ImportError::Io(_))));
    }

    #[test]
    fn size_check_boundary() {
        assert!(check_size(100, 100).is_ok());
        assert!(check_size(101, 100).is_err());
    }

    #[test]
    fn upload_new_strips_directories() {
        let upload = Upload::new("../tmp/dados.xlsx", vec![1, 2, 3]);
        assert_eq!(upload.file_name, "dados.xlsx");
        assert_eq!(upload.size_bytes(), 3);
    }
}
