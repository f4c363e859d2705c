//! Fetch-and-save flow behind a file row's download action
//!
//! Streams a signed URL to disk with buffered writes, progress reporting and
//! cancellation. The URL must still be valid; listings are re-fetched to get
//! fresh ones.

mod types;
mod worker;

pub use types::{DownloadError, DownloadProgress};
pub use worker::{download_url_to_file, save_object, ProgressCallback, WRITE_BUFFER_SIZE};
