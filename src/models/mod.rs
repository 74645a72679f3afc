use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Short-lived credentials returned by STS for an assumed role.
#[derive(Clone)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: Option<DateTime<Utc>>,
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub key: String,
    pub last_modified: DateTime<Utc>,
    pub size: i64,
}

/// One page of a bucket listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectDescriptor>,
    pub next_continuation_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatestObject {
    pub object: ObjectDescriptor,
    pub object_count: usize,
}

#[derive(Debug, Clone)]
pub struct DownloadedObject {
    pub local_path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub object: ObjectDescriptor,
}

/// Outcome of one cross-account copy.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransferResult {
    pub success: bool,
    pub filename: Option<String>,
    pub source_file: Option<PathBuf>,
    pub destination_bucket: Option<String>,
    pub destination_key: Option<String>,
    pub local_file_cleaned: bool,
    pub error: Option<String>,
}

impl TransferResult {
    pub fn succeeded(
        downloaded: &DownloadedObject,
        destination_bucket: &str,
        destination_key: String,
        local_file_cleaned: bool,
    ) -> Self {
        Self {
            success: true,
            filename: Some(downloaded.file_name.clone()),
            source_file: Some(downloaded.local_path.clone()),
            destination_bucket: Some(destination_bucket.to_string()),
            destination_key: Some(destination_key),
            local_file_cleaned,
            error: None,
        }
    }

    pub fn failed(error: String, source_file: Option<PathBuf>) -> Self {
        Self {
            success: false,
            source_file,
            error: Some(error),
            ..Default::default()
        }
    }

    /// `s3://bucket/key` of the uploaded object, when there is one.
    pub fn destination_uri(&self) -> Option<String> {
        match (&self.destination_bucket, &self.destination_key) {
            (Some(bucket), Some(key)) => Some(format!("s3://{}/{}", bucket, key)),
            _ => None,
        }
    }
}
