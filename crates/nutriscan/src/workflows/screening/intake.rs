use std::path::Path;

use crate::config::IntakeConfig;

use super::domain::ImageBlob;

/// A user-supplied file before validation.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub filename: String,
    /// Media type as declared by the source (browser, HTTP header, extension).
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileCandidate {
    pub fn new(filename: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            media_type: Some(media_type.into()),
            bytes,
        }
    }

    /// Read a file from disk, declaring its media type from the extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let media_type = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string());

        Ok(Self {
            filename,
            media_type,
            bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("'{filename}' is not an image (declared type: {declared})")]
    NotAnImage { filename: String, declared: String },
    #[error("'{filename}' is empty")]
    Empty { filename: String },
    #[error("'{filename}' is {size} bytes, above the {limit} byte upload limit")]
    TooLarge {
        filename: String,
        size: usize,
        limit: usize,
    },
}

/// Validates and stages uploads; never touches workflow state.
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadIntake {
    config: IntakeConfig,
}

impl UploadIntake {
    pub fn new(config: IntakeConfig) -> Self {
        Self { config }
    }

    pub fn submit(&self, candidate: FileCandidate) -> Result<ImageBlob, ValidationError> {
        let FileCandidate {
            filename,
            media_type,
            bytes,
        } = candidate;

        let declared = media_type.unwrap_or_default();
        let parsed = declared
            .parse::<mime::Mime>()
            .ok()
            .filter(|mime| mime.type_() == mime::IMAGE);
        let Some(parsed) = parsed else {
            let declared = if declared.trim().is_empty() {
                "none".to_string()
            } else {
                declared
            };
            return Err(ValidationError::NotAnImage { filename, declared });
        };

        if bytes.is_empty() {
            return Err(ValidationError::Empty { filename });
        }
        if bytes.len() > self.config.max_upload_bytes {
            return Err(ValidationError::TooLarge {
                filename,
                size: bytes.len(),
                limit: self.config.max_upload_bytes,
            });
        }

        Ok(ImageBlob::new(
            filename,
            parsed.essence_str().to_string(),
            bytes,
        ))
    }
}
