use crate::config::StorageConfig;
use crate::services::connector::{AssumedRoleConnector, StorageConnector};
use crate::services::credentials::StsRoleAssumer;
use aws_config::SdkConfig;
use aws_sdk_s3::config::Region;
use std::sync::Arc;
use tracing::info;

/// Shared SDK configuration: base credentials from the default provider chain,
/// the requested region, and an optional custom endpoint.
pub async fn load_sdk_config(region: &str, storage_config: &StorageConfig) -> SdkConfig {
    let mut loader = aws_config::from_env().region(Region::new(region.to_string()));

    if let Some(endpoint_url) = &storage_config.endpoint_url {
        info!("☁️  Using custom AWS endpoint: {}", endpoint_url);
        loader = loader.endpoint_url(endpoint_url);
    }

    loader.load().await
}

pub async fn setup_connector(
    region: &str,
    storage_config: &StorageConfig,
) -> Arc<dyn StorageConnector> {
    let sdk_config = load_sdk_config(region, storage_config).await;
    let sts_client = aws_sdk_sts::Client::new(&sdk_config);

    Arc::new(AssumedRoleConnector::new(
        Arc::new(StsRoleAssumer::new(sts_client)),
        sdk_config,
        storage_config.clone(),
    ))
}
