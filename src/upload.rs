use actix_multipart::{Multipart, MultipartError};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

pub const ALLOWED_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "zip"];

/// Multipart field carrying the uploaded file.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    NoFile,
    #[error("Invalid file type. Only .txt, .md, .pdf, and .zip files are allowed.")]
    InvalidType,
    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub original_name: String,
    pub path: PathBuf,
}

pub fn is_allowed(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// `<unix millis>-<original name>`, so repeated uploads never collide on name alone.
pub fn stored_name(original_name: &str) -> String {
    format!("{}-{}", chrono::Utc::now().timestamp_millis(), original_name)
}

/// Stores the first `file` field of the form below `dir`.
///
/// Other fields are skipped. A partially written file is removed when the
/// body breaks off mid-upload.
pub async fn store_upload(dir: &Path, mut payload: Multipart) -> Result<StoredUpload, UploadError> {
    while let Some(field) = payload.next().await {
        let mut field = field?;
        let file_name = field
            .content_disposition()
            .filter(|cd| cd.get_name() == Some(FILE_FIELD))
            .and_then(|cd| cd.get_filename())
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())
            .map(str::to_string);

        let Some(original_name) = file_name else {
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        };
        if !is_allowed(&original_name) {
            return Err(UploadError::InvalidType);
        }

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(stored_name(&original_name));
        let mut file = tokio::fs::File::create(&path).await?;
        let written = async {
            while let Some(chunk) = field.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;
            Ok::<(), UploadError>(())
        }
        .await;
        if let Err(e) = written {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }

        return Ok(StoredUpload {
            original_name,
            path,
        });
    }
    Err(UploadError::NoFile)
}
