//! Browse an S3-compatible bucket as folders and files.
//!
//! [`ListingResolver`] turns a key prefix into the folders and objects
//! directly below it, giving every object a time-limited signed download URL.
//! [`ContentsQuery`] wraps it in a per-prefix fetch state machine with a
//! cache, and [`view`] holds the pure helpers a UI renders from.

pub mod config;
pub mod download;
pub mod error;
pub mod listing;
pub mod providers;
pub mod query;
pub mod view;

pub use config::ExplorerConfig;
pub use error::{ExplorerError, StorageError, StorageResult};
pub use listing::{
    ExclusionFilter, FolderEntry, ListingResolver, ListingResult, ObjectEntry, Prefix, SignedUrl,
};
pub use providers::memory::MemoryBackend;
pub use providers::s3::S3Backend;
pub use providers::StorageBackend;
pub use query::{ContentsQuery, FetchState};

/// Build the S3-backed explorer for `config`.
pub async fn connect(config: &ExplorerConfig) -> Result<ContentsQuery<S3Backend>, ExplorerError> {
    config.validate()?;
    let backend = S3Backend::from_config(config).await;
    log::info!(
        "explorer_ready: bucket={} region={} endpoint={:?}",
        config.bucket,
        config.region,
        config.endpoint_url()
    );
    Ok(ContentsQuery::from_config(backend, config))
}

/// Build the S3-backed explorer from environment variables.
pub async fn connect_from_env() -> Result<ContentsQuery<S3Backend>, ExplorerError> {
    let config = ExplorerConfig::from_env()?;
    connect(&config).await
}
