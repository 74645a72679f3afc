use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Failed to assume role: {0}")]
    AssumeRole(String),

    #[error("No objects found in prefix: s3://{bucket}/{prefix}")]
    NoObjects { bucket: String, prefix: String },

    #[error("AWS API error: {0:#}")]
    Provider(#[from] anyhow::Error),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Local I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    /// Errors caused by the request itself rather than by AWS or the local disk.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TransferError::Validation(_) | TransferError::NoObjects { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;
