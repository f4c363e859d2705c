//! Contents query: per-prefix fetch state machine with a memoising cache.
//!
//! Each prefix moves through `Idle -> Loading -> Success | Error`. Results are
//! cached by prefix and served again while fresh; a listing is never served
//! once one of its signed URLs is about to expire. Concurrent fetches of one
//! prefix share a single request, and starting a fetch evicts entries that
//! can no longer be served.

use crate::config::{ExplorerConfig, DEFAULT_CACHE_MAX_AGE_SECS};
use crate::listing::{ListingResolver, ListingResult, Prefix};
use crate::providers::StorageBackend;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// A cached listing is refetched once a signed URL is this close to expiry.
pub const URL_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Success(Arc<ListingResult>),
    /// Failure message, shown verbatim by the view.
    Error(String),
}

impl FetchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchState::Idle => "idle",
            FetchState::Loading => "loading",
            FetchState::Success(_) => "success",
            FetchState::Error(_) => "error",
        }
    }

    pub fn listing(&self) -> Option<&ListingResult> {
        match self {
            FetchState::Success(listing) => Some(listing),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl std::fmt::Display for FetchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

type InFlight = watch::Receiver<Option<FetchState>>;

#[derive(Debug)]
struct CacheEntry {
    state: FetchState,
    generation: u64,
    fetched_at: Option<DateTime<Utc>>,
    /// Result channel of the fetch that owns this entry while it is loading.
    in_flight: Option<InFlight>,
}

impl CacheEntry {
    /// Receiver for a fetch that is still running. A fetch whose future was
    /// dropped closes its channel and no longer counts.
    fn pending(&self) -> Option<InFlight> {
        self.in_flight
            .as_ref()
            .filter(|rx| rx.has_changed().is_ok())
            .cloned()
    }
}

enum Plan {
    Cached(FetchState),
    Join(InFlight),
    Start(u64, watch::Sender<Option<FetchState>>),
}

/// Fetches listings through a [`ListingResolver`] and caches them by prefix.
pub struct ContentsQuery<B> {
    resolver: ListingResolver<B>,
    entries: Mutex<HashMap<Prefix, CacheEntry>>,
    generation: AtomicU64,
    max_age: Duration,
}

impl<B: StorageBackend> ContentsQuery<B> {
    pub fn new(resolver: ListingResolver<B>) -> Self {
        ContentsQuery {
            resolver,
            entries: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            max_age: Duration::seconds(DEFAULT_CACHE_MAX_AGE_SECS as i64),
        }
    }

    pub fn from_config(backend: B, config: &ExplorerConfig) -> Self {
        ContentsQuery::new(ListingResolver::from_config(backend, config))
            .with_max_age(std::time::Duration::from_secs(config.cache_max_age_secs))
    }

    /// How long a successful listing is served from cache.
    pub fn with_max_age(mut self, max_age: std::time::Duration) -> Self {
        self.max_age = Duration::from_std(max_age).unwrap_or(Duration::MAX);
        self
    }

    pub fn resolver(&self) -> &ListingResolver<B> {
        &self.resolver
    }

    /// Current state for `prefix` without triggering a fetch.
    pub async fn state(&self, prefix: &Prefix) -> FetchState {
        self.entries
            .lock()
            .await
            .get(prefix)
            .map(|entry| entry.state.clone())
            .unwrap_or_default()
    }

    /// Prefixes that currently hold a cache entry.
    pub async fn cached_prefixes(&self) -> Vec<Prefix> {
        let mut prefixes: Vec<Prefix> = self.entries.lock().await.keys().cloned().collect();
        prefixes.sort();
        prefixes
    }

    /// Return the cached listing for `prefix` if it is still fresh, otherwise
    /// resolve it again.
    ///
    /// A fetch of the same prefix already in flight is joined instead of
    /// starting another one. [`ContentsQuery::refetch`] always starts a new
    /// fetch, superseding the running one: the older result is returned to
    /// its callers but not cached.
    pub async fn fetch(&self, prefix: &Prefix) -> FetchState {
        let plan = {
            let mut entries = self.entries.lock().await;
            let reuse = match entries.get(prefix) {
                Some(entry) if self.is_fresh(entry, Utc::now()) => {
                    debug!("contents_cache_hit: prefix={:?}", prefix.as_str());
                    Some(Plan::Cached(entry.state.clone()))
                }
                Some(entry) => entry.pending().map(Plan::Join),
                None => None,
            };
            match reuse {
                Some(plan) => plan,
                None => {
                    let (generation, done) = self.begin(&mut entries, prefix);
                    Plan::Start(generation, done)
                }
            }
        };

        match plan {
            Plan::Cached(state) => state,
            Plan::Join(mut pending) => {
                debug!("contents_fetch_joined: prefix={:?}", prefix.as_str());
                let joined = pending
                    .wait_for(Option::is_some)
                    .await
                    .ok()
                    .and_then(|state| (*state).clone());
                match joined {
                    Some(state) => state,
                    None => self.start(prefix).await,
                }
            }
            Plan::Start(generation, done) => self.run(prefix, generation, done).await,
        }
    }

    /// Mark `prefix` as loading under a new generation, evicting entries that
    /// can no longer be served.
    fn begin(
        &self,
        entries: &mut HashMap<Prefix, CacheEntry>,
        prefix: &Prefix,
    ) -> (u64, watch::Sender<Option<FetchState>>) {
        let now = Utc::now();
        let before = entries.len();
        entries.retain(|key, entry| {
            key == prefix || entry.pending().is_some() || self.is_fresh(entry, now)
        });
        if entries.len() < before {
            debug!("contents_cache_evicted: entries={}", before - entries.len());
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (done, in_flight) = watch::channel(None);
        entries.insert(
            prefix.clone(),
            CacheEntry {
                state: FetchState::Loading,
                generation,
                fetched_at: None,
                in_flight: Some(in_flight),
            },
        );
        (generation, done)
    }

    async fn start(&self, prefix: &Prefix) -> FetchState {
        let (generation, done) = {
            let mut entries = self.entries.lock().await;
            self.begin(&mut entries, prefix)
        };
        self.run(prefix, generation, done).await
    }

    async fn run(
        &self,
        prefix: &Prefix,
        generation: u64,
        done: watch::Sender<Option<FetchState>>,
    ) -> FetchState {
        let state = match self.resolver.resolve(prefix).await {
            Ok(listing) => FetchState::Success(Arc::new(listing)),
            Err(e) => {
                warn!("contents_fetch_failed: prefix={:?} error={}", prefix.as_str(), e);
                FetchState::Error(e.to_string())
            }
        };

        let mut entries = self.entries.lock().await;
        match entries.get_mut(prefix) {
            Some(entry) if entry.generation == generation => {
                entry.state = state.clone();
                entry.fetched_at = Some(Utc::now());
                entry.in_flight = None;
            }
            _ => debug!(
                "contents_fetch_superseded: prefix={:?} generation={}",
                prefix.as_str(),
                generation
            ),
        }
        drop(entries);

        done.send_replace(Some(state.clone()));
        state
    }

    /// Drop any cached state for `prefix` and fetch it again.
    pub async fn refetch(&self, prefix: &Prefix) -> FetchState {
        self.invalidate(prefix).await;
        self.fetch(prefix).await
    }

    pub async fn invalidate(&self, prefix: &Prefix) {
        self.entries.lock().await.remove(prefix);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let (FetchState::Success(listing), Some(fetched_at)) = (&entry.state, entry.fetched_at)
        else {
            return false;
        };

        if now - fetched_at >= self.max_age {
            return false;
        }

        let margin = Duration::seconds(URL_REFRESH_MARGIN_SECS);
        listing
            .objects
            .iter()
            .all(|object| !object.download_url.expires_within(now, margin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::memory::MemoryBackend;

    fn backend() -> Arc<MemoryBackend> {
        Arc::new(
            MemoryBackend::new()
                .with_object("docs/a.txt", 1)
                .with_object("docs/b.txt", 2),
        )
    }

    fn query(backend: &Arc<MemoryBackend>) -> ContentsQuery<Arc<MemoryBackend>> {
        ContentsQuery::new(ListingResolver::new(backend.clone(), "bucket"))
    }

    #[tokio::test]
    async fn unknown_prefix_is_idle() {
        let backend = backend();
        let query = query(&backend);
        assert_eq!(query.state(&Prefix::parse("docs/")).await, FetchState::Idle);
        assert_eq!(backend.list_calls(), 0);
    }

    #[tokio::test]
    async fn fetch_caches_success_by_prefix() {
        let backend = backend();
        let query = query(&backend);
        let prefix = Prefix::parse("docs/");

        let first = query.fetch(&prefix).await;
        assert_eq!(first.as_str(), "success");
        assert_eq!(first.listing().unwrap().objects.len(), 2);

        let second = query.fetch(&prefix).await;
        assert_eq!(first, second);
        assert_eq!(backend.list_calls(), 1);
        assert_eq!(query.state(&prefix).await, first);

        query.fetch(&Prefix::root()).await;
        assert_eq!(backend.list_calls(), 2);
    }

    #[tokio::test]
    async fn stale_entries_are_refetched_and_resigned() {
        let backend = backend();
        let query = query(&backend).with_max_age(std::time::Duration::ZERO);
        let prefix = Prefix::parse("docs/");

        let first = query.fetch(&prefix).await;
        let second = query.fetch(&prefix).await;

        assert_eq!(backend.list_calls(), 2);
        assert_eq!(backend.sign_calls(), 4);
        assert_ne!(
            first.listing().unwrap().objects[0].download_url.url,
            second.listing().unwrap().objects[0].download_url.url
        );
    }

    #[tokio::test]
    async fn short_lived_urls_are_never_served_from_cache() {
        let backend = backend();
        let resolver = ListingResolver::new(backend.clone(), "bucket")
            .with_url_ttl(std::time::Duration::from_secs(30));
        let query = ContentsQuery::new(resolver);
        let prefix = Prefix::parse("docs/");

        query.fetch(&prefix).await;
        query.fetch(&prefix).await;

        assert_eq!(backend.list_calls(), 2);
    }

    #[tokio::test]
    async fn errors_are_reported_and_retried() {
        let backend = backend();
        backend.fail_listing("network error");
        let query = query(&backend);
        let prefix = Prefix::parse("docs/");

        let state = query.fetch(&prefix).await;
        assert_eq!(state.as_str(), "error");
        assert!(state.error().unwrap().contains("network error"));
        assert_eq!(backend.sign_calls(), 0);

        query.fetch(&prefix).await;
        assert_eq!(backend.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_is_visible_while_in_flight() {
        let backend = backend();
        backend.delay_next_listing(std::time::Duration::from_millis(50));
        let query = query(&backend);
        let prefix = Prefix::parse("docs/");

        let (state, observed) = tokio::join!(query.fetch(&prefix), async {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            query.state(&prefix).await
        });

        assert_eq!(observed, FetchState::Loading);
        assert_eq!(state.as_str(), "success");
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_fetch_does_not_overwrite_newer_state() {
        let backend = backend();
        backend.delay_next_listing(std::time::Duration::from_millis(80));
        let query = query(&backend);
        let prefix = Prefix::parse("docs/");

        let (stale, fresh) = tokio::join!(query.fetch(&prefix), async {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            query.refetch(&prefix).await
        });

        // Every fetch re-signs, so the two results differ in their URLs.
        assert_eq!(stale.as_str(), "success");
        assert_eq!(fresh.as_str(), "success");
        assert_ne!(stale, fresh);
        assert_eq!(query.state(&prefix).await, fresh);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_fetches_share_one_request() {
        let backend = backend();
        backend.delay_next_listing(std::time::Duration::from_millis(50));
        let query = query(&backend);
        let prefix = Prefix::parse("docs/");

        let (first, second) = tokio::join!(query.fetch(&prefix), query.fetch(&prefix));

        assert_eq!(backend.list_calls(), 1);
        assert_eq!(backend.sign_calls(), 2);
        assert_eq!(first.as_str(), "success");
        assert_eq!(first, second);
        assert_eq!(query.state(&prefix).await, first);
    }

    #[tokio::test]
    async fn stale_entries_for_other_prefixes_are_evicted() {
        let backend = backend();
        let query = query(&backend).with_max_age(std::time::Duration::ZERO);
        let docs = Prefix::parse("docs/");

        query.fetch(&docs).await;
        assert_eq!(query.cached_prefixes().await, vec![docs.clone()]);

        query.fetch(&Prefix::root()).await;

        assert_eq!(query.cached_prefixes().await, vec![Prefix::root()]);
        assert_eq!(query.state(&docs).await, FetchState::Idle);
    }

    #[tokio::test]
    async fn fresh_entries_for_other_prefixes_are_kept() {
        let backend = backend();
        let query = query(&backend);
        let docs = Prefix::parse("docs/");

        query.fetch(&docs).await;
        query.fetch(&Prefix::root()).await;

        assert_eq!(query.cached_prefixes().await, vec![Prefix::root(), docs.clone()]);
        assert_eq!(query.state(&docs).await.as_str(), "success");
    }

    #[tokio::test]
    async fn invalidate_and_clear_reset_to_idle() {
        let backend = backend();
        let query = query(&backend);
        let docs = Prefix::parse("docs/");

        query.fetch(&docs).await;
        query.invalidate(&docs).await;
        assert_eq!(query.state(&docs).await, FetchState::Idle);

        query.fetch(&docs).await;
        query.fetch(&Prefix::root()).await;
        query.clear().await;
        assert_eq!(query.state(&Prefix::root()).await, FetchState::Idle);
    }
}
