use std::path::Path;

use tracing::warn;
use validator::{Validate, ValidationErrors};

use crate::error::{JobFault, INVALID_TYPE_MESSAGE, MISSING_FILE_MESSAGE, OVERSIZED_FILE_MESSAGE};

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Largest accepted upload, in bytes (10 MB)
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// A document selected for submission
#[derive(Debug, Clone, Validate)]
pub struct PdfUpload {
    #[validate(length(min = 1, message = "File name must not be empty"))]
    pub file_name: String,
    /// Media type declared for the file
    pub content_type: String,
    #[validate(length(min = 1, message = "Please select a PDF file"))]
    pub bytes: Vec<u8>,
}

impl PdfUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Build an upload whose media type is derived from the file name.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = media_type_for(Path::new(&file_name));
        Self::new(file_name, content_type, bytes)
    }

    /// Read a file from disk into an upload.
    pub async fn from_path(path: &Path) -> Result<Self, JobFault> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            warn!("Cannot read {}: {}", path.display(), e);
            JobFault::Validation(MISSING_FILE_MESSAGE.to_string())
        })?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::from_bytes(file_name, bytes))
    }

    pub fn is_pdf(&self) -> bool {
        let essence = self.content_type.split(';').next().unwrap_or_default().trim();
        essence.eq_ignore_ascii_case(PDF_MEDIA_TYPE)
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Local checks run before anything touches the network.
    pub fn check(&self, max_size: usize) -> Result<(), JobFault> {
        if !self.is_pdf() {
            return Err(JobFault::Validation(INVALID_TYPE_MESSAGE.to_string()));
        }

        if let Err(errors) = self.validate() {
            return Err(JobFault::Validation(first_message(&errors)));
        }

        if self.size() > max_size {
            return Err(JobFault::Validation(OVERSIZED_FILE_MESSAGE.to_string()));
        }

        Ok(())
    }
}

/// Media type implied by a path's extension.
pub fn media_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => PDF_MEDIA_TYPE,
        _ => "application/octet-stream",
    }
}

/// Pick one message out of a set of field errors, ordered by field name.
fn first_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Validation error in field: {}", field))
            })
        })
        .next()
        .unwrap_or_else(|| MISSING_FILE_MESSAGE.to_string())
}
