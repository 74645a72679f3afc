use crate::error::{Result, TransferError};
use std::path::{Component, Path, PathBuf};

/// Every IAM role ARN starts with this, whatever the account or role path.
pub const ROLE_ARN_PREFIX: &str = "arn:aws:iam::";

/// Fails on the first blank value, naming it.
pub fn validate_required(fields: &[(&str, &str)]) -> Result<()> {
    if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(TransferError::Validation(format!(
            "Missing required parameter: {}",
            name
        )));
    }
    Ok(())
}

pub fn validate_role_arn(role_arn: &str) -> Result<()> {
    if !role_arn.starts_with(ROLE_ARN_PREFIX) {
        return Err(TransferError::Validation(format!(
            "Invalid role ARN format: {}",
            role_arn
        )));
    }
    Ok(())
}

/// Last path segment of an object key, split on both `/` and `\`.
///
/// The result must be a single plain file name so joining it onto the local
/// directory can never escape it.
pub fn object_file_name(key: &str) -> Result<String> {
    let name = key.rsplit(['/', '\\']).next().unwrap_or_default();

    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if name.is_empty() || name == "." || name == ".." || !single_normal {
        return Err(TransferError::Validation(format!(
            "Object key has no usable file name: {}",
            key
        )));
    }
    Ok(name.to_string())
}

/// Where an object with the given key is written inside `local_dir`.
pub fn local_path_for(local_dir: &Path, key: &str) -> Result<(PathBuf, String)> {
    let name = object_file_name(key)?;
    Ok((local_dir.join(&name), name))
}

/// Destination key for an uploaded file.
///
/// Trailing slashes on the prefix collapse into one separator; an empty prefix
/// puts the file at the bucket root.
pub fn destination_key(prefix: &str, file_name: &str) -> String {
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), file_name)
    }
}
