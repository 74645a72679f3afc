use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};

/// Renders an AWS error as `Code - Message` when the provider sent them,
/// falling back to the full error chain for transport failures.
pub fn describe_aws_error<E>(err: &E) -> String
where
    E: ProvideErrorMetadata + std::error::Error,
{
    match (err.code(), err.message()) {
        (Some(code), Some(message)) => format!("{} - {}", code, message),
        (Some(code), None) => code.to_string(),
        _ => DisplayErrorContext(err).to_string(),
    }
}

/// `describe_aws_error` wrapped for `?` in anyhow-returning adapters.
pub fn aws_error<E>(err: E) -> anyhow::Error
where
    E: ProvideErrorMetadata + std::error::Error,
{
    anyhow::anyhow!(describe_aws_error(&err))
}
