//! In-memory backend for tests
//!
//! Holds a sorted key space and answers delimited listings the way S3 does,
//! paging with opaque continuation tokens. Every call is counted so tests can
//! assert how often the resolver hit the backend, and failures can be
//! injected for listing or for individual keys.

use super::{ListPage, ListRequest, ListedObject, SignRequest, StorageBackend};
use crate::error::StorageResult;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Fake bucket contents plus call counters.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: Mutex<BTreeMap<String, (u64, Option<DateTime<Utc>>)>>,
    list_failure: Mutex<Option<String>>,
    list_delays: Mutex<VecDeque<Duration>>,
    failing_keys: Mutex<HashSet<String>>,
    signed_keys: Mutex<Vec<String>>,
    list_calls: AtomicUsize,
    sign_calls: AtomicUsize,
    signature_seq: AtomicU64,
    base_url: String,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            base_url: "https://memory.invalid".to_string(),
            ..Default::default()
        }
    }

    /// Add or replace an object.
    pub fn insert(&self, key: &str, size: u64, last_modified: Option<DateTime<Utc>>) {
        lock(&self.objects).insert(key.to_string(), (size, last_modified));
    }

    /// Builder-style [`MemoryBackend::insert`] with no timestamp.
    pub fn with_object(self, key: &str, size: u64) -> Self {
        self.insert(key, size, None);
        self
    }

    pub fn remove(&self, key: &str) {
        lock(&self.objects).remove(key);
    }

    /// Make every listing call fail with `message`.
    pub fn fail_listing(&self, message: &str) {
        *lock(&self.list_failure) = Some(message.to_string());
    }

    /// Delay the next listing call by `delay`. Queued delays apply to
    /// subsequent calls in order.
    pub fn delay_next_listing(&self, delay: Duration) {
        lock(&self.list_delays).push_back(delay);
    }

    /// Make signing fail for `key`.
    pub fn fail_signing(&self, key: &str) {
        lock(&self.failing_keys).insert(key.to_string());
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    /// Keys a signing call was issued for, in call order.
    pub fn signed_keys(&self) -> Vec<String> {
        lock(&self.signed_keys).clone()
    }

    fn page(&self, request: &ListRequest) -> ListPage {
        let objects = lock(&self.objects);
        let start_after = request.continuation_token.as_deref();

        // Entries are (sort key, object); a rolled-up prefix has no object and
        // keeps the position of its first key.
        let mut entries: Vec<(String, Option<ListedObject>)> = Vec::new();
        let mut seen_prefixes: HashSet<String> = HashSet::new();

        for (key, (size, last_modified)) in objects.range(request.prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&request.prefix) else {
                break;
            };
            let rolled_up = if request.delimiter.is_empty() {
                None
            } else {
                rest.find(&request.delimiter).map(|idx| {
                    format!(
                        "{}{}",
                        request.prefix,
                        &rest[..idx + request.delimiter.len()]
                    )
                })
            };
            match rolled_up {
                Some(common) => {
                    if seen_prefixes.insert(common.clone()) {
                        entries.push((common, None));
                    }
                }
                None => entries.push((
                    key.clone(),
                    Some(ListedObject {
                        key: key.clone(),
                        size: *size,
                        last_modified: *last_modified,
                    }),
                )),
            }
        }

        let remaining: Vec<_> = entries
            .into_iter()
            .filter(|(sort_key, _)| start_after.map_or(true, |after| sort_key.as_str() > after))
            .collect();

        let max_keys = usize::try_from(request.max_keys.max(1)).unwrap_or(1);
        let is_truncated = remaining.len() > max_keys;
        let page: Vec<_> = remaining.into_iter().take(max_keys).collect();

        let next_continuation_token = if is_truncated {
            page.last().map(|(sort_key, _)| sort_key.clone())
        } else {
            None
        };

        let mut result = ListPage {
            next_continuation_token,
            is_truncated,
            ..Default::default()
        };
        for (sort_key, object) in page {
            match object {
                Some(object) => result.objects.push(object),
                None => result.common_prefixes.push(sort_key),
            }
        }
        result
    }
}

impl StorageBackend for MemoryBackend {
    async fn list_page(&self, request: ListRequest) -> StorageResult<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = lock(&self.list_delays).pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = lock(&self.list_failure).clone() {
            return Err(message.into());
        }
        Ok(self.page(&request))
    }

    async fn presign_get(&self, request: SignRequest) -> StorageResult<String> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.signed_keys).push(request.key.clone());

        if lock(&self.failing_keys).contains(&request.key) {
            return Err(format!("signing rejected for {}", request.key).into());
        }

        let signature = self.signature_seq.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "{}/{}/{}?X-Amz-Expires={}&X-Amz-Signature={:016x}",
            self.base_url,
            request.bucket,
            urlencoding::encode(&request.key).replace("%2F", "/"),
            request.expires_in.as_secs(),
            signature
        ))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
