//! Storage backends the explorer can list and sign against.
//!
//! - `s3`: any S3-compatible service through `aws-sdk-s3`
//! - `memory`: an in-process bucket for tests and demos

pub mod memory;
pub mod s3;
mod s3_client;

use crate::error::StorageResult;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

/// One listing page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub bucket: String,
    pub prefix: String,
    pub delimiter: String,
    pub continuation_token: Option<String>,
    pub max_keys: i32,
}

/// An object as reported by the listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedObject {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a delimited listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub common_prefixes: Vec<String>,
    pub objects: Vec<ListedObject>,
    pub next_continuation_token: Option<String>,
    pub is_truncated: bool,
}

/// Presigned GET request for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    pub bucket: String,
    pub key: String,
    pub expires_in: Duration,
}

/// Listing and presigning capabilities of an object store.
///
/// Both calls are read-only. Implementations hold their own client and
/// credentials; nothing here is process-global.
pub trait StorageBackend: Send + Sync {
    fn list_page(&self, request: ListRequest)
        -> impl Future<Output = StorageResult<ListPage>> + Send;

    /// Returns a URL the holder can GET without further credentials for at
    /// least `request.expires_in`.
    fn presign_get(&self, request: SignRequest) -> impl Future<Output = StorageResult<String>> + Send;
}

impl<B: StorageBackend> StorageBackend for std::sync::Arc<B> {
    fn list_page(
        &self,
        request: ListRequest,
    ) -> impl Future<Output = StorageResult<ListPage>> + Send {
        (**self).list_page(request)
    }

    fn presign_get(&self, request: SignRequest) -> impl Future<Output = StorageResult<String>> + Send {
        (**self).presign_get(request)
    }
}
