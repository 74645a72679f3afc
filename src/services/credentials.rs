use crate::error::{Result, TransferError};
use crate::models::TemporaryCredentials;
use crate::utils::aws::describe_aws_error;
use async_trait::async_trait;
use aws_sdk_sts::Client;
use tracing::{error, info};

/// Exchanges a role ARN for temporary credentials.
#[async_trait]
pub trait RoleAssumer: Send + Sync {
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> Result<TemporaryCredentials>;
}

pub struct StsRoleAssumer {
    client: Client,
}

impl StsRoleAssumer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RoleAssumer for StsRoleAssumer {
    async fn assume_role(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> Result<TemporaryCredentials> {
        info!("🔑 Assuming IAM role: {}", role_arn);

        let res = self
            .client
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .send()
            .await;

        let output = match res {
            Ok(output) => output,
            Err(e) => {
                let reason = describe_aws_error(&e);
                error!("❌ Failed to assume role {}: {}", role_arn, reason);
                return Err(TransferError::AssumeRole(reason));
            }
        };

        let credentials = output.credentials().ok_or_else(|| {
            TransferError::AssumeRole(format!("STS returned no credentials for {}", role_arn))
        })?;

        let expiration = credentials.expiration();
        let expiration =
            chrono::DateTime::from_timestamp(expiration.secs(), expiration.subsec_nanos());

        info!("✅ Successfully assumed IAM role");

        Ok(TemporaryCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
            expiration,
        })
    }
}
