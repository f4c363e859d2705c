//! Download worker - streaming with buffered writes and progress tracking

use super::types::{DownloadError, DownloadProgress};
use crate::listing::ObjectEntry;
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use log::{debug, info, warn};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Write buffer size for downloads (2 MB) - reduces I/O operations
pub const WRITE_BUFFER_SIZE: usize = 2 * 1024 * 1024;

pub type ProgressCallback<'a> = &'a (dyn Fn(DownloadProgress) + Send + Sync);

/// Save one listed object into `directory`, named after its display name.
///
/// Refuses URLs that have already expired instead of letting the storage
/// service answer 403.
pub async fn save_object(
    client: &Client,
    object: &ObjectEntry,
    directory: &Path,
    cancelled: &AtomicBool,
    progress: Option<ProgressCallback<'_>>,
) -> Result<PathBuf, DownloadError> {
    if object.download_url.is_expired(Utc::now()) {
        return Err(DownloadError::Expired(object.path.clone()));
    }

    let file_name = Path::new(&object.name)
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "download".into());
    let destination = directory.join(file_name);

    download_url_to_file(
        client,
        &object.download_url.url,
        &destination,
        object.size,
        cancelled,
        progress,
    )
    .await?;

    Ok(destination)
}

/// Stream `url` into `destination`, creating parent directories.
///
/// `expected_size` is used for progress when the response carries no
/// `Content-Length`. On cancellation or a failed read or write the partial
/// file is removed.
pub async fn download_url_to_file(
    client: &Client,
    url: &str,
    destination: &Path,
    expected_size: u64,
    cancelled: &AtomicBool,
    progress: Option<ProgressCallback<'_>>,
) -> Result<u64, DownloadError> {
    debug!("download_start: {}", destination.display());

    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        warn!("download_failed: {} status={}", destination.display(), status);
        return Err(DownloadError::Status { status, body });
    }

    let total_bytes = response.content_length().unwrap_or(expected_size);
    stream_to_file(
        response.bytes_stream(),
        destination,
        total_bytes,
        cancelled,
        progress,
    )
    .await
}

/// Write `body` to `destination`. Any failure after the file is created,
/// cancellation included, removes the partial file.
async fn stream_to_file<S, B, E>(
    body: S,
    destination: &Path,
    total_bytes: u64,
    cancelled: &AtomicBool,
    progress: Option<ProgressCallback<'_>>,
) -> Result<u64, DownloadError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    DownloadError: From<E>,
{
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = File::create(destination).await?;

    let result = write_body(&mut file, body, total_bytes, cancelled, progress).await;
    drop(file);

    match result {
        Ok(downloaded_bytes) => {
            info!(
                "download_done: {} bytes={}",
                destination.display(),
                downloaded_bytes
            );
            Ok(downloaded_bytes)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(destination).await;
            match &e {
                DownloadError::Cancelled => {
                    info!("download_cancelled: {}", destination.display())
                }
                _ => warn!("download_failed: {} error={}", destination.display(), e),
            }
            Err(e)
        }
    }
}

async fn write_body<S, B, E>(
    file: &mut File,
    body: S,
    total_bytes: u64,
    cancelled: &AtomicBool,
    progress: Option<ProgressCallback<'_>>,
) -> Result<u64, DownloadError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    DownloadError: From<E>,
{
    let start_time = std::time::Instant::now();
    let mut downloaded_bytes: u64 = 0;
    let mut write_buffer = Vec::with_capacity(WRITE_BUFFER_SIZE);
    let mut body = std::pin::pin!(body);

    while let Some(chunk_result) = body.next().await {
        if cancelled.load(Ordering::SeqCst) {
            return Err(DownloadError::Cancelled);
        }

        let chunk = chunk_result?;
        let chunk = chunk.as_ref();
        write_buffer.extend_from_slice(chunk);
        downloaded_bytes += chunk.len() as u64;

        if write_buffer.len() >= WRITE_BUFFER_SIZE {
            file.write_all(&write_buffer).await?;
            write_buffer.clear();
            report(progress, downloaded_bytes, total_bytes, start_time);
        }
    }

    if !write_buffer.is_empty() {
        file.write_all(&write_buffer).await?;
    }
    file.flush().await?;

    report(progress, downloaded_bytes, downloaded_bytes.max(total_bytes), start_time);
    Ok(downloaded_bytes)
}

fn report(
    progress: Option<ProgressCallback<'_>>,
    downloaded_bytes: u64,
    total_bytes: u64,
    start_time: std::time::Instant,
) {
    let Some(callback) = progress else {
        return;
    };

    let percent = if total_bytes > 0 {
        std::cmp::min(
            ((downloaded_bytes as f64 / total_bytes as f64) * 100.0) as u32,
            100,
        )
    } else {
        100
    };

    let elapsed = start_time.elapsed().as_secs_f64();
    let speed = if elapsed > 0.0 {
        downloaded_bytes as f64 / elapsed
    } else {
        0.0
    };

    callback(DownloadProgress {
        percent,
        downloaded_bytes,
        total_bytes,
        speed,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::SignedUrl;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn object(url: String, expires_in: chrono::Duration) -> ObjectEntry {
        ObjectEntry {
            name: "report.csv".to_string(),
            path: "docs/report.csv".to_string(),
            last_modified: None,
            size: 11,
            download_url: SignedUrl {
                url,
                expires_at: Utc::now() + expires_in,
            },
        }
    }

    #[tokio::test]
    async fn saves_object_body_to_directory() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bucket/docs/report.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"a,b\n1,2\n3,4".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let entry = object(
            format!("{}/bucket/docs/report.csv?X-Amz-Signature=abc", server.uri()),
            chrono::Duration::hours(1),
        );
        let updates = Mutex::new(Vec::new());
        let record = |p: DownloadProgress| updates.lock().unwrap().push(p);
        let on_progress: ProgressCallback<'_> = &record;

        let saved = save_object(
            &Client::new(),
            &entry,
            &dir.path().join("nested"),
            &AtomicBool::new(false),
            Some(on_progress),
        )
        .await
        .unwrap();

        assert_eq!(saved, dir.path().join("nested").join("report.csv"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"a,b\n1,2\n3,4");
        let updates = updates.lock().unwrap();
        let last = updates.last().unwrap();
        assert_eq!(last.percent, 100);
        assert_eq!(last.downloaded_bytes, 11);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("AccessDenied"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = download_url_to_file(
            &Client::new(),
            &format!("{}/bucket/key", server.uri()),
            &dir.path().join("key"),
            0,
            &AtomicBool::new(false),
            None,
        )
        .await
        .unwrap_err();

        match err {
            DownloadError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "AccessDenied");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!dir.path().join("key").exists());
    }

    #[tokio::test]
    async fn expired_url_is_refused_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let entry = object(
            format!("{}/bucket/docs/report.csv", server.uri()),
            chrono::Duration::seconds(-1),
        );

        let err = save_object(
            &Client::new(),
            &entry,
            dir.path(),
            &AtomicBool::new(false),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DownloadError::Expired(ref key) if key == "docs/report.csv"));
    }

    #[tokio::test]
    async fn cancellation_removes_partial_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("blob.bin");
        let err = download_url_to_file(
            &Client::new(),
            &format!("{}/bucket/blob.bin", server.uri()),
            &destination,
            4096,
            &AtomicBool::new(true),
            None,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, DownloadError::Cancelled));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn body_error_mid_stream_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("broken.bin");
        let body = futures_util::stream::iter(vec![
            Ok(vec![1u8; 1024]),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )),
        ]);

        let err = stream_to_file(body, &destination, 4096, &AtomicBool::new(false), None)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Io(_)));
        assert!(!destination.exists());
    }
}
