//! S3 presigned URL generation

use crate::error::StorageResult;
use crate::providers::SignRequest;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;

/// Generate a presigned GET URL for object access
pub(super) async fn generate_presigned_url(
    client: &Client,
    request: &SignRequest,
) -> StorageResult<String> {
    let presigning_config = PresigningConfig::builder()
        .expires_in(request.expires_in)
        .build()?;

    let presigned_request = client
        .get_object()
        .bucket(&request.bucket)
        .key(&request.key)
        .presigned(presigning_config)
        .await
        .map_err(|e| DisplayErrorContext(e).to_string())?;

    Ok(presigned_request.uri().to_string())
}
