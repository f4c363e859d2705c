//! S3 backend handle

use crate::config::ExplorerConfig;
use crate::providers::s3_client::create_s3_client;
use aws_sdk_s3::Client;

/// Shared S3 client, constructed once and injected into the resolver.
#[derive(Debug, Clone)]
pub struct S3Backend {
    client: Client,
}

impl S3Backend {
    /// Create a backend from explorer settings (region, endpoint, credentials).
    pub async fn from_config(config: &ExplorerConfig) -> Self {
        S3Backend {
            client: create_s3_client(config).await,
        }
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client) -> Self {
        S3Backend { client }
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }
}
