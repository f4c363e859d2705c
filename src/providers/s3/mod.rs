//! S3-compatible backend (AWS S3, Cloudflare R2, MinIO)
//!
//! - `types`: the backend handle and client creation
//! - `list`: delimited listing pages
//! - `presigned`: presigned GET URLs

mod list;
mod presigned;
mod types;

pub use types::S3Backend;

use super::{ListPage, ListRequest, SignRequest, StorageBackend};
use crate::error::StorageResult;

impl StorageBackend for S3Backend {
    async fn list_page(&self, request: ListRequest) -> StorageResult<ListPage> {
        list::list_page(self.client(), &request).await
    }

    async fn presign_get(&self, request: SignRequest) -> StorageResult<String> {
        presigned::generate_presigned_url(self.client(), &request).await
    }
}
