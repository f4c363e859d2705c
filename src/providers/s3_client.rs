use crate::config::ExplorerConfig;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::Client;

/// Build an S3 client for `config`.
///
/// Explicit keys win; otherwise credentials come from the ambient AWS chain
/// (environment, profile, instance metadata).
pub(crate) async fn create_s3_client(config: &ExplorerConfig) -> Client {
    let region = Region::new(config.region.clone());

    let mut builder = match (&config.access_key_id, &config.secret_access_key) {
        (Some(access_key_id), Some(secret_access_key)) => {
            let credentials = Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "bucket-explorer",
            );
            S3ConfigBuilder::new()
                .behavior_version(BehaviorVersion::latest())
                .credentials_provider(credentials)
                .region(region)
        }
        _ => {
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .load()
                .await;
            S3ConfigBuilder::from(&shared)
        }
    };

    if let Some(endpoint_url) = config.endpoint_url() {
        builder = builder.endpoint_url(endpoint_url);
    }

    if config.force_path_style {
        builder = builder.force_path_style(true);
    }

    Client::from_conf(builder.build())
}
