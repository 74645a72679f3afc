use crate::error::{Result, TransferError};
use crate::models::{LatestObject, ObjectDescriptor};
use crate::services::storage::StorageService;
use tracing::info;

/// Running maximum over a listing, by last-modified time.
///
/// Only a strictly newer object replaces the current pick, so the first object
/// seen wins among equal timestamps.
#[derive(Debug, Default)]
pub struct LatestObjectTracker {
    latest: Option<ObjectDescriptor>,
    object_count: usize,
}

impl LatestObjectTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, object: ObjectDescriptor) {
        self.object_count += 1;
        let newer = match &self.latest {
            Some(current) => object.last_modified > current.last_modified,
            None => true,
        };
        if newer {
            self.latest = Some(object);
        }
    }

    pub fn object_count(&self) -> usize {
        self.object_count
    }

    pub fn finish(self) -> Option<LatestObject> {
        let object_count = self.object_count;
        self.latest.map(|object| LatestObject {
            object,
            object_count,
        })
    }
}

/// Pages through every object under `prefix` and returns the most recently
/// modified one.
pub async fn find_latest_object(
    storage: &dyn StorageService,
    prefix: &str,
) -> Result<LatestObject> {
    info!("📋 Listing objects in s3://{}/{}", storage.bucket(), prefix);

    let mut tracker = LatestObjectTracker::new();
    let mut continuation_token = None;
    let mut page_num = 0;

    loop {
        let page = storage.list_objects_page(prefix, continuation_token).await?;
        page_num += 1;

        if !page.objects.is_empty() {
            let page_len = page.objects.len();
            for object in page.objects {
                tracker.observe(object);
            }
            info!("Processed page {}, found {} objects", page_num, page_len);
        }

        match page.next_continuation_token {
            Some(token) => continuation_token = Some(token),
            None => break,
        }
    }

    let latest = tracker.finish().ok_or_else(|| TransferError::NoObjects {
        bucket: storage.bucket().to_string(),
        prefix: prefix.to_string(),
    })?;

    info!(
        "Found {} total objects. Latest object: {}",
        latest.object_count, latest.object.key
    );
    info!(
        "Last modified: {}, Size: {} bytes",
        latest.object.last_modified, latest.object.size
    );

    Ok(latest)
}
