use crate::config::StorageConfig;
use crate::error::TransferError;
use crate::services::credentials::RoleAssumer;
use crate::services::storage::{S3StorageService, StorageService};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::config::Credentials;
use std::sync::Arc;
use std::time::SystemTime;

/// Hands out a bucket handle authorised by an assumed role.
#[async_trait]
pub trait StorageConnector: Send + Sync {
    async fn connect(
        &self,
        role_arn: &str,
        session_name: &str,
        bucket: &str,
    ) -> Result<Arc<dyn StorageService>, TransferError>;
}

/// Assumes the role through STS and builds an S3 client from the temporary
/// credentials, on top of the shared SDK configuration.
pub struct AssumedRoleConnector {
    assumer: Arc<dyn RoleAssumer>,
    sdk_config: SdkConfig,
    storage_config: StorageConfig,
}

impl AssumedRoleConnector {
    pub fn new(
        assumer: Arc<dyn RoleAssumer>,
        sdk_config: SdkConfig,
        storage_config: StorageConfig,
    ) -> Self {
        Self {
            assumer,
            sdk_config,
            storage_config,
        }
    }
}

#[async_trait]
impl StorageConnector for AssumedRoleConnector {
    async fn connect(
        &self,
        role_arn: &str,
        session_name: &str,
        bucket: &str,
    ) -> Result<Arc<dyn StorageService>, TransferError> {
        let creds = self.assumer.assume_role(role_arn, session_name).await?;

        let credentials = Credentials::new(
            creds.access_key_id,
            creds.secret_access_key,
            Some(creds.session_token),
            creds.expiration.map(SystemTime::from),
            "assumed-role",
        );

        let s3_config = aws_sdk_s3::config::Builder::from(&self.sdk_config)
            .credentials_provider(credentials)
            .force_path_style(self.storage_config.force_path_style)
            .build();

        let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
        Ok(Arc::new(S3StorageService::new(
            s3_client,
            bucket.to_string(),
            self.storage_config.multipart_threshold,
            self.storage_config.chunk_size,
        )))
    }
}
