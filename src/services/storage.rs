use crate::models::{ObjectDescriptor, ObjectPage};
use crate::utils::aws::{aws_error, describe_aws_error};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// S3 rejects multipart uploads with more parts than this.
pub const MAX_UPLOAD_PARTS: u64 = 10_000;

const MIB: u64 = 1024 * 1024;

/// Part size for a multipart upload of `file_size` bytes.
///
/// Uses `chunk_size` unless that would need more than [`MAX_UPLOAD_PARTS`]
/// parts, in which case the size grows to the next whole MiB that fits.
pub fn part_size_for(file_size: u64, chunk_size: usize) -> usize {
    let min_part = file_size.div_ceil(MAX_UPLOAD_PARTS).div_ceil(MIB) * MIB;
    (chunk_size as u64).max(min_part) as usize
}

/// Object operations against a single bucket.
#[async_trait]
pub trait StorageService: Send + Sync {
    fn bucket(&self) -> &str;

    /// Lists one page of objects under `prefix`. The returned page carries the
    /// token for the next page, or `None` once the listing is exhausted.
    async fn list_objects_page(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage>;

    /// Streams an object to `path`, overwriting it. Returns the bytes written.
    async fn download_to_file(&self, key: &str, path: &Path) -> Result<u64>;

    async fn upload_from_file(&self, key: &str, path: &Path) -> Result<()>;
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
    multipart_threshold: u64,
    chunk_size: usize,
}

impl S3StorageService {
    pub fn new(
        client: Client,
        bucket: String,
        multipart_threshold: u64,
        chunk_size: usize,
    ) -> Self {
        Self {
            client,
            bucket,
            multipart_threshold,
            chunk_size,
        }
    }

    async fn upload_multipart(&self, key: &str, path: &Path, part_size: usize) -> Result<()> {
        let multipart_upload_res = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(aws_error)?;

        let upload_id = multipart_upload_res
            .upload_id()
            .ok_or_else(|| anyhow!("No upload ID"))?
            .to_string();

        let result = self.upload_parts(key, &upload_id, path, part_size).await;

        if let Err(e) = &result {
            tracing::warn!(
                "Multipart upload of s3://{}/{} failed, aborting: {:#}",
                self.bucket,
                key,
                e
            );
            if let Err(abort_err) = self
                .client
                .abort_multipart_upload()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(&upload_id)
                .send()
                .await
            {
                tracing::error!(
                    "Failed to abort multipart upload {} for s3://{}/{}: {}",
                    upload_id,
                    self.bucket,
                    key,
                    describe_aws_error(&abort_err)
                );
            }
        }

        result
    }

    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        path: &Path,
        chunk_size: usize,
    ) -> Result<()> {
        let mut reader = tokio::fs::File::open(path).await?;
        let mut chunk_index = 1;
        let mut completed_parts = Vec::new();

        let mut buffer = vec![0u8; chunk_size];

        loop {
            let mut n = 0;
            while n < chunk_size {
                let read = reader.read(&mut buffer[n..]).await?;
                if read == 0 {
                    break;
                }
                n += read;
            }

            if n == 0 {
                break;
            }

            let body = ByteStream::from(buffer[..n].to_vec());
            let upload_part_res = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .body(body)
                .part_number(chunk_index)
                .send()
                .await
                .map_err(aws_error)?;

            completed_parts.push(
                CompletedPart::builder()
                    .e_tag(upload_part_res.e_tag().unwrap_or_default())
                    .part_number(chunk_index)
                    .build(),
            );

            tracing::debug!("Uploaded part {} ({} bytes) of {}", chunk_index, n, key);
            chunk_index += 1;
        }

        let completed_multipart_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed_multipart_upload)
            .send()
            .await
            .map_err(aws_error)?;

        Ok(())
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_objects_page(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage> {
        let res = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(aws_error)?;

        let mut objects = Vec::new();
        if let Some(contents) = res.contents {
            for object in contents {
                let Some(key) = object.key else {
                    continue;
                };
                let last_modified = object
                    .last_modified
                    .and_then(|d| chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos()))
                    .unwrap_or_default();

                objects.push(ObjectDescriptor {
                    key,
                    last_modified,
                    size: object.size.unwrap_or(0),
                });
            }
        }

        let next_continuation_token = if res.is_truncated.unwrap_or(false) {
            res.next_continuation_token
        } else {
            None
        };

        Ok(ObjectPage {
            objects,
            next_continuation_token,
        })
    }

    async fn download_to_file(&self, key: &str, path: &Path) -> Result<u64> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(aws_error)?;

        let mut body = res.body;
        let mut file = tokio::fs::File::create(path).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = body.try_next().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }

    async fn upload_from_file(&self, key: &str, path: &Path) -> Result<()> {
        let size = tokio::fs::metadata(path).await?.len();

        if size > self.multipart_threshold {
            let part_size = part_size_for(size, self.chunk_size);
            tracing::info!(
                "📦 {} bytes over the {} byte threshold, multipart upload with {} byte parts",
                size,
                self.multipart_threshold,
                part_size
            );
            return self.upload_multipart(key, path, part_size).await;
        }

        let body = ByteStream::from_path(path).await?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(aws_error)?;
        Ok(())
    }
}
