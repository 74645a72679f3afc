use crate::config::{BucketLocation, TransferConfig};
use crate::error::{Result, TransferError};
use crate::models::{DownloadedObject, TransferResult};
use crate::services::connector::StorageConnector;
use crate::services::locator::find_latest_object;
use crate::utils::validation::{
    destination_key, local_path_for, validate_required, validate_role_arn,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Drives the download-upload-cleanup pipeline.
pub struct TransferService {
    connector: Arc<dyn StorageConnector>,
}

impl TransferService {
    pub fn new(connector: Arc<dyn StorageConnector>) -> Self {
        Self { connector }
    }

    /// Downloads the most recently modified object under the source prefix
    /// into `local_dir`.
    pub async fn download_latest_object(
        &self,
        source: &BucketLocation,
        session_name: &str,
        local_dir: &Path,
    ) -> Result<DownloadedObject> {
        let result = self
            .download_latest_object_inner(source, session_name, local_dir)
            .await;
        if let Err(e) = &result {
            error!("Download error: {}", e);
        }
        result
    }

    async fn download_latest_object_inner(
        &self,
        source: &BucketLocation,
        session_name: &str,
        local_dir: &Path,
    ) -> Result<DownloadedObject> {
        info!(
            "⬇️  Starting download of last modified object from s3://{}/{}",
            source.bucket, source.prefix
        );

        let local_dir_display = local_dir.to_string_lossy();
        validate_required(&[
            ("role_arn", source.role_arn.as_str()),
            ("bucket_name", source.bucket.as_str()),
            ("prefix", source.prefix.as_str()),
            ("local_dir", local_dir_display.as_ref()),
        ])?;
        validate_role_arn(&source.role_arn)?;

        info!("📁 Ensuring local directory exists: {}", local_dir.display());
        tokio::fs::create_dir_all(local_dir).await?;
        if !tokio::fs::metadata(local_dir).await?.is_dir() {
            return Err(TransferError::Validation(format!(
                "Failed to create or access directory: {}",
                local_dir.display()
            )));
        }

        let storage = self
            .connector
            .connect(&source.role_arn, session_name, &source.bucket)
            .await?;

        let latest = find_latest_object(storage.as_ref(), &source.prefix).await?;
        let object = latest.object;
        let (local_path, file_name) = local_path_for(local_dir, &object.key)?;

        if tokio::fs::try_exists(&local_path).await? {
            warn!(
                "⚠️  File already exists at {}, it will be overwritten",
                local_path.display()
            );
        }

        info!("Downloading {} to {}...", object.key, local_path.display());
        storage
            .download_to_file(&object.key, &local_path)
            .await
            .map_err(|e| TransferError::Download(format!("{:#}", e)))?;

        let size = match tokio::fs::metadata(&local_path).await {
            Ok(meta) => meta.len(),
            Err(_) => {
                return Err(TransferError::Download(format!(
                    "File not found at {}",
                    local_path.display()
                )));
            }
        };
        info!(
            "✅ Successfully downloaded: {} (Size: {} bytes)",
            local_path.display(),
            size
        );

        Ok(DownloadedObject {
            local_path,
            file_name,
            size,
            object,
        })
    }

    /// Uploads `local_path` under the destination prefix and returns the key
    /// it was written to.
    pub async fn upload_to_destination(
        &self,
        destination: &BucketLocation,
        session_name: &str,
        local_path: &Path,
    ) -> Result<String> {
        validate_role_arn(&destination.role_arn)?;

        let storage = self
            .connector
            .connect(&destination.role_arn, session_name, &destination.bucket)
            .await?;

        let file_name = local_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                TransferError::Validation(format!(
                    "Local file has no usable name: {}",
                    local_path.display()
                ))
            })?;
        let key = destination_key(&destination.prefix, file_name);

        info!(
            "⬆️  Uploading {} to s3://{}/{}",
            local_path.display(),
            destination.bucket,
            key
        );
        if let Err(e) = storage.upload_from_file(&key, local_path).await {
            error!("AWS API error during upload: {:#}", e);
            return Err(TransferError::Upload(format!("{:#}", e)));
        }

        info!("✅ Successfully uploaded to s3://{}/{}", destination.bucket, key);
        Ok(key)
    }

    /// Runs the whole copy. Never fails outright: errors come back inside a
    /// failed [`TransferResult`], and the local file is kept for inspection.
    pub async fn copy_across_accounts(&self, config: &TransferConfig) -> TransferResult {
        let mut local_file: Option<PathBuf> = None;

        match self.run_pipeline(config, &mut local_file).await {
            Ok(result) => result,
            Err(e) => {
                error!("Cross-account copy failed: {}", e);

                if let Some(path) = &local_file {
                    if path.exists() {
                        info!("Local file retained for debugging: {}", path.display());
                    }
                }

                TransferResult::failed(e.to_string(), local_file)
            }
        }
    }

    async fn run_pipeline(
        &self,
        config: &TransferConfig,
        local_file: &mut Option<PathBuf>,
    ) -> Result<TransferResult> {
        config.validate()?;

        let downloaded = self
            .download_latest_object(
                &config.source,
                &config.session_names.source,
                &config.local_dir,
            )
            .await?;
        *local_file = Some(downloaded.local_path.clone());

        let key = self
            .upload_to_destination(
                &config.destination,
                &config.session_names.destination,
                &downloaded.local_path,
            )
            .await?;

        let cleaned = if config.cleanup {
            remove_local_file(&downloaded.local_path).await
        } else {
            false
        };

        Ok(TransferResult::succeeded(
            &downloaded,
            &config.destination.bucket,
            key,
            cleaned,
        ))
    }
}

async fn remove_local_file(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }

    info!("🧹 Cleaning up local file: {}", path.display());
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                "Uploaded successfully but could not remove {}: {}",
                path.display(),
                e
            );
            false
        }
    }
}
