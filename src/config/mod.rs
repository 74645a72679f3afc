use crate::error::{Result, TransferError};
use crate::utils::validation::{validate_required, validate_role_arn};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_SOURCE_SESSION_NAME: &str = "S3DownloadSession";
pub const DEFAULT_DEST_SESSION_NAME: &str = "S3UploadSession";

/// Smallest part size S3 accepts for every part but the last one.
pub const MIN_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Directory used for the temporary copy when `--local-dir` is not given.
pub fn default_local_dir() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("C:\\DBBackups\\")
    } else {
        env::temp_dir().join("DBBackups")
    }
}

/// One side of the transfer: the role to assume and where to look in S3.
#[derive(Debug, Clone, Default)]
pub struct BucketLocation {
    pub role_arn: String,
    pub bucket: String,
    pub prefix: String,
}

/// STS session names used for each side of the transfer.
#[derive(Debug, Clone)]
pub struct SessionNames {
    pub source: String,
    pub destination: String,
}

impl Default for SessionNames {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE_SESSION_NAME.to_string(),
            destination: DEFAULT_DEST_SESSION_NAME.to_string(),
        }
    }
}

impl SessionNames {
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            source: env::var("SOURCE_SESSION_NAME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default.source),
            destination: env::var("DEST_SESSION_NAME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default.destination),
        }
    }
}

/// Everything a single cross-account copy needs.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub source: BucketLocation,
    pub destination: BucketLocation,
    pub local_dir: PathBuf,
    pub region: String,
    pub cleanup: bool,
    pub session_names: SessionNames,
}

impl TransferConfig {
    pub fn new(source: BucketLocation, destination: BucketLocation) -> Self {
        Self {
            source,
            destination,
            local_dir: default_local_dir(),
            region: DEFAULT_REGION.to_string(),
            cleanup: true,
            session_names: SessionNames::default(),
        }
    }

    /// Checks the request before any role is assumed.
    ///
    /// The source side needs every field; the destination prefix may be empty,
    /// in which case the object lands at the bucket root.
    pub fn validate(&self) -> Result<()> {
        validate_required(&[
            ("source role ARN", self.source.role_arn.as_str()),
            ("source bucket", self.source.bucket.as_str()),
            ("source prefix", self.source.prefix.as_str()),
            ("destination role ARN", self.destination.role_arn.as_str()),
            ("destination bucket", self.destination.bucket.as_str()),
        ])?;

        if self.local_dir.as_os_str().is_empty() {
            return Err(TransferError::Validation(
                "Missing required parameter: local directory".to_string(),
            ));
        }

        validate_role_arn(&self.source.role_arn)?;
        validate_role_arn(&self.destination.role_arn)?;
        Ok(())
    }
}

/// S3 client tuning, read from the environment.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Custom endpoint for S3 and STS (MinIO, LocalStack)
    pub endpoint_url: Option<String>,

    /// Use path-style bucket addressing (default: false)
    pub force_path_style: bool,

    /// Uploads larger than this go through multipart upload (default: 100 MB)
    pub multipart_threshold: u64,

    /// Multipart part size in bytes (default: 10 MB)
    pub chunk_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            force_path_style: false,
            multipart_threshold: 100 * 1024 * 1024, // 100 MB
            chunk_size: 10 * 1024 * 1024,           // 10 MB
        }
    }
}

impl StorageConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            endpoint_url: env::var("AWS_ENDPOINT_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            force_path_style: env::var("S3_FORCE_PATH_STYLE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.force_path_style),

            multipart_threshold: env::var("MULTIPART_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.multipart_threshold),

            chunk_size: env::var("CHUNK_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(|size: usize| size.max(MIN_CHUNK_SIZE))
                .unwrap_or(default.chunk_size),
        }
    }
}
