use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use s3_cross_account_copy::TransferError;
use s3_cross_account_copy::config::{BucketLocation, TransferConfig};
use s3_cross_account_copy::models::{ObjectDescriptor, ObjectPage};
use s3_cross_account_copy::services::connector::StorageConnector;
use s3_cross_account_copy::services::locator::find_latest_object;
use s3_cross_account_copy::services::storage::StorageService;
use s3_cross_account_copy::services::transfer::TransferService;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const SOURCE_ROLE: &str = "arn:aws:iam::111111111111:role/BackupReader";
const DEST_ROLE: &str = "arn:aws:iam::222222222222:role/BackupWriter";

struct MemoryBucket {
    name: String,
    page_size: usize,
    objects: Vec<(ObjectDescriptor, Vec<u8>)>,
    uploaded: Mutex<HashMap<String, Vec<u8>>>,
    fail_uploads: bool,
    pin_local_file: bool,
    list_calls: AtomicUsize,
    downloads: AtomicUsize,
}

impl MemoryBucket {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            page_size: 1000,
            objects: Vec::new(),
            uploaded: Mutex::new(HashMap::new()),
            fail_uploads: false,
            pin_local_file: false,
            list_calls: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
        }
    }

    fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    fn with_object(mut self, key: &str, modified_secs: i64, body: &[u8]) -> Self {
        self.objects.push((
            ObjectDescriptor {
                key: key.to_string(),
                last_modified: Utc.timestamp_opt(modified_secs, 0).unwrap(),
                size: body.len() as i64,
            },
            body.to_vec(),
        ));
        self
    }

    fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    /// After a successful upload, swaps the local file for a directory of the
    /// same name so it can no longer be removed as a file.
    fn pinning_local_file(mut self) -> Self {
        self.pin_local_file = true;
        self
    }

    fn uploaded(&self, key: &str) -> Option<Vec<u8>> {
        self.uploaded.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl StorageService for MemoryBucket {
    fn bucket(&self) -> &str {
        &self.name
    }

    async fn list_objects_page(
        &self,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> anyhow::Result<ObjectPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let matching: Vec<&ObjectDescriptor> = self
            .objects
            .iter()
            .map(|(object, _)| object)
            .filter(|object| object.key.starts_with(prefix))
            .collect();

        let start: usize = match continuation_token {
            Some(token) => token.parse()?,
            None => 0,
        };
        let end = (start + self.page_size).min(matching.len());

        Ok(ObjectPage {
            objects: matching[start..end].iter().map(|o| (*o).clone()).collect(),
            next_continuation_token: (end < matching.len()).then(|| end.to_string()),
        })
    }

    async fn download_to_file(&self, key: &str, path: &Path) -> anyhow::Result<u64> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let (_, body) = self
            .objects
            .iter()
            .find(|(object, _)| object.key == key)
            .ok_or_else(|| anyhow!("NoSuchKey: {}", key))?;
        tokio::fs::write(path, body).await?;
        Ok(body.len() as u64)
    }

    async fn upload_from_file(&self, key: &str, path: &Path) -> anyhow::Result<()> {
        if self.fail_uploads {
            return Err(anyhow!("AccessDenied - not allowed to write {}", key));
        }
        let body = tokio::fs::read(path).await?;
        self.uploaded.lock().unwrap().insert(key.to_string(), body);
        if self.pin_local_file {
            tokio::fs::remove_file(path).await?;
            tokio::fs::create_dir(path).await?;
        }
        Ok(())
    }
}

/// Maps role ARNs to in-memory buckets; unknown roles are rejected like STS would.
struct MemoryConnector {
    buckets: HashMap<String, Arc<MemoryBucket>>,
    connections: Mutex<Vec<(String, String)>>,
}

impl MemoryConnector {
    fn new(source: Arc<MemoryBucket>, destination: Arc<MemoryBucket>) -> Self {
        let mut buckets = HashMap::new();
        buckets.insert(SOURCE_ROLE.to_string(), source);
        buckets.insert(DEST_ROLE.to_string(), destination);
        Self {
            buckets,
            connections: Mutex::new(Vec::new()),
        }
    }

    fn connection_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }
}

#[async_trait]
impl StorageConnector for MemoryConnector {
    async fn connect(
        &self,
        role_arn: &str,
        session_name: &str,
        _bucket: &str,
    ) -> Result<Arc<dyn StorageService>, TransferError> {
        self.connections
            .lock()
            .unwrap()
            .push((role_arn.to_string(), session_name.to_string()));

        match self.buckets.get(role_arn) {
            Some(bucket) => Ok(bucket.clone() as Arc<dyn StorageService>),
            None => Err(TransferError::AssumeRole(format!(
                "AccessDenied - not authorized to assume {}",
                role_arn
            ))),
        }
    }
}

fn config(local_dir: &Path, source_prefix: &str, dest_prefix: &str) -> TransferConfig {
    let mut config = TransferConfig::new(
        BucketLocation {
            role_arn: SOURCE_ROLE.to_string(),
            bucket: "source-backups".to_string(),
            prefix: source_prefix.to_string(),
        },
        BucketLocation {
            role_arn: DEST_ROLE.to_string(),
            bucket: "dest-backups".to_string(),
            prefix: dest_prefix.to_string(),
        },
    );
    config.local_dir = local_dir.to_path_buf();
    config
}

fn default_source() -> MemoryBucket {
    MemoryBucket::new("source-backups")
        .with_object("db/a.bak", 1_700_000_000, b"older backup")
        .with_object("db/b.bak", 1_700_000_500, b"newest backup")
}

#[tokio::test]
async fn test_locator_picks_newest_across_pages() {
    let bucket = MemoryBucket::new("source-backups")
        .with_page_size(2)
        .with_object("db/1.bak", 100, b"1")
        .with_object("db/2.bak", 200, b"2")
        .with_object("db/5.bak", 500, b"5")
        .with_object("db/3.bak", 300, b"3")
        .with_object("db/4.bak", 400, b"4");

    let latest = find_latest_object(&bucket, "db/").await.unwrap();

    assert_eq!(latest.object.key, "db/5.bak");
    assert_eq!(latest.object_count, 5);
    assert_eq!(bucket.list_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_locator_only_considers_prefix() {
    let bucket = MemoryBucket::new("source-backups")
        .with_object("db/a.bak", 100, b"a")
        .with_object("logs/newer.log", 900, b"log");

    let latest = find_latest_object(&bucket, "db/").await.unwrap();
    assert_eq!(latest.object.key, "db/a.bak");
    assert_eq!(latest.object_count, 1);
}

#[tokio::test]
async fn test_locator_empty_prefix_errors() {
    let bucket = MemoryBucket::new("source-backups").with_object("logs/x.log", 100, b"x");

    let err = find_latest_object(&bucket, "db/").await.unwrap_err();
    assert!(matches!(err, TransferError::NoObjects { .. }));
    assert_eq!(
        err.to_string(),
        "No objects found in prefix: s3://source-backups/db/"
    );
}

#[tokio::test]
async fn test_copy_success_with_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(default_source());
    let dest = Arc::new(MemoryBucket::new("dest-backups"));
    let connector = Arc::new(MemoryConnector::new(source.clone(), dest.clone()));
    let service = TransferService::new(connector.clone());

    let result = service
        .copy_across_accounts(&config(dir.path(), "db/", "incoming"))
        .await;

    assert!(result.success, "unexpected failure: {:?}", result.error);
    assert_eq!(result.filename.as_deref(), Some("b.bak"));
    assert_eq!(result.destination_bucket.as_deref(), Some("dest-backups"));
    assert_eq!(result.destination_key.as_deref(), Some("incoming/b.bak"));
    assert_eq!(
        result.destination_uri().as_deref(),
        Some("s3://dest-backups/incoming/b.bak")
    );
    assert!(result.local_file_cleaned);
    assert_eq!(result.source_file, Some(dir.path().join("b.bak")));
    assert!(!dir.path().join("b.bak").exists());

    assert_eq!(dest.uploaded("incoming/b.bak"), Some(b"newest backup".to_vec()));

    let connections = connector.connections.lock().unwrap().clone();
    assert_eq!(
        connections,
        vec![
            (SOURCE_ROLE.to_string(), "S3DownloadSession".to_string()),
            (DEST_ROLE.to_string(), "S3UploadSession".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_copy_without_cleanup_keeps_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(default_source());
    let dest = Arc::new(MemoryBucket::new("dest-backups"));
    let service = TransferService::new(Arc::new(MemoryConnector::new(source, dest.clone())));

    let mut config = config(dir.path(), "db/", "incoming/");
    config.cleanup = false;
    let result = service.copy_across_accounts(&config).await;

    assert!(result.success);
    assert!(!result.local_file_cleaned);
    assert_eq!(result.destination_key.as_deref(), Some("incoming/b.bak"));
    let kept = std::fs::read(dir.path().join("b.bak")).unwrap();
    assert_eq!(kept, b"newest backup");
}

#[tokio::test]
async fn test_empty_destination_prefix_uploads_to_root() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(default_source());
    let dest = Arc::new(MemoryBucket::new("dest-backups"));
    let service = TransferService::new(Arc::new(MemoryConnector::new(source, dest.clone())));

    let result = service
        .copy_across_accounts(&config(dir.path(), "db/", ""))
        .await;

    assert!(result.success);
    assert_eq!(result.destination_key.as_deref(), Some("b.bak"));
    assert!(dest.uploaded("b.bak").is_some());
}

#[tokio::test]
async fn test_upload_failure_retains_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(default_source());
    let dest = Arc::new(MemoryBucket::new("dest-backups").failing_uploads());
    let service = TransferService::new(Arc::new(MemoryConnector::new(source, dest)));

    let result = service
        .copy_across_accounts(&config(dir.path(), "db/", "incoming"))
        .await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.starts_with("Upload failed:"), "{}", error);
    assert!(error.contains("AccessDenied"));
    assert_eq!(result.source_file, Some(dir.path().join("b.bak")));
    assert!(dir.path().join("b.bak").exists());
}

#[tokio::test]
async fn test_cleanup_failure_keeps_success() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(default_source());
    let dest = Arc::new(MemoryBucket::new("dest-backups").pinning_local_file());
    let service = TransferService::new(Arc::new(MemoryConnector::new(source, dest.clone())));

    let result = service
        .copy_across_accounts(&config(dir.path(), "db/", "incoming"))
        .await;

    assert!(result.success, "unexpected failure: {:?}", result.error);
    assert!(!result.local_file_cleaned);
    assert!(result.error.is_none());
    assert_eq!(result.destination_key.as_deref(), Some("incoming/b.bak"));
    assert!(dest.uploaded("incoming/b.bak").is_some());
    assert!(dir.path().join("b.bak").exists());
}

#[tokio::test]
async fn test_empty_source_prefix_skips_download() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(MemoryBucket::new("source-backups"));
    let dest = Arc::new(MemoryBucket::new("dest-backups"));
    let connector = Arc::new(MemoryConnector::new(source.clone(), dest));
    let service = TransferService::new(connector.clone());

    let result = service
        .copy_across_accounts(&config(dir.path(), "db/", "incoming"))
        .await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("No objects found in prefix: s3://source-backups/db/")
    );
    assert!(result.source_file.is_none());
    assert_eq!(source.downloads.load(Ordering::SeqCst), 0);
    // only the source role was assumed
    assert_eq!(connector.connection_count(), 1);
}

#[tokio::test]
async fn test_malformed_destination_arn_fails_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(default_source());
    let dest = Arc::new(MemoryBucket::new("dest-backups"));
    let connector = Arc::new(MemoryConnector::new(source.clone(), dest));
    let service = TransferService::new(connector.clone());

    let mut config = config(dir.path(), "db/", "incoming");
    config.destination.role_arn = "BackupWriter".to_string();
    let result = service.copy_across_accounts(&config).await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("Validation error: Invalid role ARN format: BackupWriter")
    );
    assert_eq!(connector.connection_count(), 0);
    assert_eq!(source.downloads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rejected_source_role_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(default_source());
    let dest = Arc::new(MemoryBucket::new("dest-backups"));
    let service = TransferService::new(Arc::new(MemoryConnector::new(source, dest)));

    let mut config = config(dir.path(), "db/", "incoming");
    config.source.role_arn = "arn:aws:iam::333333333333:role/Unknown".to_string();
    let result = service.copy_across_accounts(&config).await;

    assert!(!result.success);
    let error = result.error.unwrap();
    assert!(error.starts_with("Failed to assume role: AccessDenied"), "{}", error);
    assert!(result.source_file.is_none());
}

#[tokio::test]
async fn test_download_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("b.bak"), b"stale contents").unwrap();

    let source = Arc::new(default_source());
    let dest = Arc::new(MemoryBucket::new("dest-backups"));
    let service = TransferService::new(Arc::new(MemoryConnector::new(source, dest)));

    let config = config(dir.path(), "db/", "incoming");
    let downloaded = service
        .download_latest_object(&config.source, "S3DownloadSession", &config.local_dir)
        .await
        .unwrap();

    assert_eq!(downloaded.file_name, "b.bak");
    assert_eq!(downloaded.size, b"newest backup".len() as u64);
    assert_eq!(downloaded.object.key, "db/b.bak");
    assert_eq!(std::fs::read(&downloaded.local_path).unwrap(), b"newest backup");
}

#[tokio::test]
async fn test_download_creates_missing_local_dir() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested").join("backups");

    let source = Arc::new(default_source());
    let dest = Arc::new(MemoryBucket::new("dest-backups"));
    let service = TransferService::new(Arc::new(MemoryConnector::new(source, dest)));

    let config = config(&nested, "db/", "incoming");
    let downloaded = service
        .download_latest_object(&config.source, "S3DownloadSession", &config.local_dir)
        .await
        .unwrap();

    assert_eq!(downloaded.local_path, nested.join("b.bak"));
    assert!(downloaded.local_path.exists());
}

#[tokio::test]
async fn test_folder_marker_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(
        MemoryBucket::new("source-backups")
            .with_object("db/a.bak", 100, b"a")
            .with_object("db/archive/", 900, b""),
    );
    let dest = Arc::new(MemoryBucket::new("dest-backups"));
    let service = TransferService::new(Arc::new(MemoryConnector::new(source.clone(), dest)));

    let config = config(dir.path(), "db/", "incoming");
    let err = service
        .download_latest_object(&config.source, "S3DownloadSession", &config.local_dir)
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(source.downloads.load(Ordering::SeqCst), 0);
}
