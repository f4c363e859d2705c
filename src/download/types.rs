//! Download progress and error types

use serde::Serialize;
use thiserror::Error;

/// Progress snapshot, reported on every buffer flush and once on completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadProgress {
    pub percent: u32,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub speed: f64, // bytes per second
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Download request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Download failed: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("Failed to write file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Signed URL for '{0}' has expired; refresh the listing")]
    Expired(String),

    #[error("Download cancelled")]
    Cancelled,
}
