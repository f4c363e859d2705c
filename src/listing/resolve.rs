//! Listing resolver: prefix in, folders and signed objects out.

use super::exclude::ExclusionFilter;
use super::gather::gather_all_or_fail;
use super::prefix::Prefix;
use super::types::{FolderEntry, ListingResult, ObjectEntry, SignedUrl};
use crate::config::{
    ExplorerConfig, DEFAULT_PAGE_SIZE, DEFAULT_SIGN_CONCURRENCY, DEFAULT_URL_TTL_SECS,
};
use crate::error::ExplorerError;
use crate::providers::{ListRequest, ListedObject, SignRequest, StorageBackend};
use crate::view::navigation_url;
use chrono::Utc;
use log::{debug, info, warn};
use std::time::Duration;

const DELIMITER: &str = "/";

/// Resolves one prefix of one bucket into a [`ListingResult`].
///
/// Holds no per-request state: concurrent `resolve` calls are independent.
#[derive(Debug)]
pub struct ListingResolver<B> {
    backend: B,
    bucket: String,
    exclude: ExclusionFilter,
    url_ttl: Duration,
    page_size: i32,
    max_pages: Option<usize>,
    sign_concurrency: usize,
}

impl<B: StorageBackend> ListingResolver<B> {
    /// Resolver for `bucket` with default TTL, paging and no exclusion.
    pub fn new(backend: B, bucket: impl Into<String>) -> Self {
        ListingResolver {
            backend,
            bucket: bucket.into(),
            exclude: ExclusionFilter::none(),
            url_ttl: Duration::from_secs(DEFAULT_URL_TTL_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: None,
            sign_concurrency: DEFAULT_SIGN_CONCURRENCY,
        }
    }

    pub fn from_config(backend: B, config: &ExplorerConfig) -> Self {
        ListingResolver {
            backend,
            bucket: config.bucket.clone(),
            exclude: ExclusionFilter::new(config.exclude_pattern.as_deref()),
            url_ttl: Duration::from_secs(config.url_ttl_secs),
            page_size: config.page_size,
            max_pages: config.max_pages,
            sign_concurrency: config.sign_concurrency.max(1),
        }
    }

    pub fn with_exclusion(mut self, exclude: ExclusionFilter) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_url_ttl(mut self, ttl: Duration) -> Self {
        self.url_ttl = ttl;
        self
    }

    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size.clamp(1, 1000);
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_sign_concurrency(mut self, limit: usize) -> Self {
        self.sign_concurrency = limit.max(1);
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn url_ttl(&self) -> Duration {
        self.url_ttl
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// List the folders and objects directly under `prefix` and sign a
    /// download URL for every visible object.
    ///
    /// Fails as a whole if the listing or any signing call fails.
    pub async fn resolve(&self, prefix: &Prefix) -> Result<ListingResult, ExplorerError> {
        debug!("resolve_start: bucket={} prefix={:?}", self.bucket, prefix.as_str());

        let (common_prefixes, listed, truncated) = self.list_all(prefix).await?;

        let folders: Vec<FolderEntry> = common_prefixes
            .into_iter()
            .filter_map(|path| {
                let name = child_name(prefix, &path)?;
                if self.exclude.is_excluded(&path) {
                    return None;
                }
                Some(FolderEntry {
                    name: name.to_string(),
                    navigation_url: navigation_url(&Prefix::from_key(&path)),
                    path,
                })
            })
            .collect();

        let visible: Vec<ListedObject> = listed
            .into_iter()
            .filter(|object| {
                // Zero-byte folder placeholders, including the prefix itself.
                !object.key.ends_with(DELIMITER)
                    && child_name(prefix, &object.key).is_some()
                    && !self.exclude.is_excluded(&object.key)
            })
            .collect();

        let signing = visible.into_iter().map(|object| self.sign_object(prefix, object));
        let objects = gather_all_or_fail(signing, self.sign_concurrency).await?;

        info!(
            "resolve_done: bucket={} prefix={:?} folders={} objects={} truncated={}",
            self.bucket,
            prefix.as_str(),
            folders.len(),
            objects.len(),
            truncated
        );

        Ok(ListingResult {
            prefix: prefix.as_str().to_string(),
            folders,
            objects,
            truncated,
        })
    }

    /// Follow continuation tokens until the listing is complete or the page
    /// cap is reached. Folders repeated across pages are kept once.
    async fn list_all(
        &self,
        prefix: &Prefix,
    ) -> Result<(Vec<String>, Vec<ListedObject>, bool), ExplorerError> {
        let mut folders: Vec<String> = Vec::new();
        let mut objects: Vec<ListedObject> = Vec::new();
        let mut continuation_token: Option<String> = None;
        let mut page_count = 0usize;

        loop {
            let request = ListRequest {
                bucket: self.bucket.clone(),
                prefix: prefix.as_str().to_string(),
                delimiter: DELIMITER.to_string(),
                continuation_token: continuation_token.take(),
                max_keys: self.page_size,
            };

            let page = self
                .backend
                .list_page(request)
                .await
                .map_err(|e| ExplorerError::listing(prefix.as_str(), e))?;
            page_count += 1;

            objects.extend(page.objects);
            for folder in page.common_prefixes {
                if !folders.contains(&folder) {
                    folders.push(folder);
                }
            }

            debug!(
                "resolve_page: prefix={:?} page={} items={}",
                prefix.as_str(),
                page_count,
                objects.len() + folders.len()
            );

            if !page.is_truncated {
                return Ok((folders, objects, false));
            }
            let Some(token) = page.next_continuation_token else {
                warn!(
                    "resolve_truncated: prefix={:?} page {} is truncated without a continuation token",
                    prefix.as_str(),
                    page_count
                );
                return Ok((folders, objects, true));
            };
            if self.max_pages.is_some_and(|cap| page_count >= cap) {
                warn!(
                    "resolve_truncated: prefix={:?} stopped after {} pages",
                    prefix.as_str(),
                    page_count
                );
                return Ok((folders, objects, true));
            }

            continuation_token = Some(token);
        }
    }

    async fn sign_object(
        &self,
        prefix: &Prefix,
        object: ListedObject,
    ) -> Result<ObjectEntry, ExplorerError> {
        let issued_at = Utc::now();
        let url = self
            .backend
            .presign_get(SignRequest {
                bucket: self.bucket.clone(),
                key: object.key.clone(),
                expires_in: self.url_ttl,
            })
            .await
            .map_err(|e| ExplorerError::signing(&object.key, e))?;

        let ttl = chrono::Duration::from_std(self.url_ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_URL_TTL_SECS as i64));

        Ok(ObjectEntry {
            name: child_name(prefix, &object.key)
                .unwrap_or_default()
                .to_string(),
            path: object.key,
            last_modified: object.last_modified,
            size: object.size,
            download_url: SignedUrl {
                url,
                expires_at: issued_at + ttl,
            },
        })
    }
}

/// Name below `prefix`, warning about entries the backend returned outside it.
fn child_name<'a>(prefix: &Prefix, path: &'a str) -> Option<&'a str> {
    let name = prefix.child_name(path);
    if name.is_none() {
        warn!(
            "resolve_skip: {:?} is not below prefix {:?}",
            path,
            prefix.as_str()
        );
    }
    name
}
