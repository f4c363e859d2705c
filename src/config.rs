//! Process-wide explorer configuration.
//!
//! Built once at startup, either deserialized from the host application or read
//! from the environment, then handed to [`crate::S3Backend`] and
//! [`crate::ListingResolver`].

use crate::error::ExplorerError;
use serde::{Deserialize, Serialize};

/// Default lifetime of signed download URLs (1 hour).
pub const DEFAULT_URL_TTL_SECS: u64 = 3600;

/// Default number of signing calls in flight per listing.
pub const DEFAULT_SIGN_CONCURRENCY: usize = 16;

/// Default age after which a cached listing is fetched again.
pub const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 30;

/// Keys requested per listing page.
pub const DEFAULT_PAGE_SIZE: i32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExplorerConfig {
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Explicit credentials. When absent the ambient AWS credential chain is used.
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub endpoint_scheme: Option<String>,
    #[serde(default)]
    pub endpoint_host: Option<String>,
    #[serde(default)]
    pub force_path_style: bool,
    /// Regex matched against full keys and prefixes; matches are hidden.
    #[serde(default)]
    pub exclude_pattern: Option<String>,
    #[serde(default = "default_url_ttl")]
    pub url_ttl_secs: u64,
    /// Stop following continuation tokens after this many pages.
    #[serde(default)]
    pub max_pages: Option<usize>,
    #[serde(default = "default_page_size")]
    pub page_size: i32,
    #[serde(default = "default_sign_concurrency")]
    pub sign_concurrency: usize,
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age_secs: u64,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_url_ttl() -> u64 {
    DEFAULT_URL_TTL_SECS
}

fn default_page_size() -> i32 {
    DEFAULT_PAGE_SIZE
}

fn default_sign_concurrency() -> usize {
    DEFAULT_SIGN_CONCURRENCY
}

fn default_cache_max_age() -> u64 {
    DEFAULT_CACHE_MAX_AGE_SECS
}

impl ExplorerConfig {
    /// Config for `bucket` with every other setting at its default.
    pub fn new(bucket: impl Into<String>) -> Self {
        ExplorerConfig {
            bucket: bucket.into(),
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            endpoint_scheme: None,
            endpoint_host: None,
            force_path_style: false,
            exclude_pattern: None,
            url_ttl_secs: DEFAULT_URL_TTL_SECS,
            max_pages: None,
            page_size: DEFAULT_PAGE_SIZE,
            sign_concurrency: DEFAULT_SIGN_CONCURRENCY,
            cache_max_age_secs: DEFAULT_CACHE_MAX_AGE_SECS,
        }
    }

    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ExplorerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to
    /// its value. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ExplorerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bucket = get("BUCKET_NAME")
            .ok_or_else(|| ExplorerError::config("BUCKET_NAME", "must be set"))?;

        let mut config = ExplorerConfig::new(bucket);
        if let Some(region) = get("AWS_REGION") {
            config.region = region;
        }
        config.access_key_id = get("AWS_ACCESS_KEY_ID");
        config.secret_access_key = get("AWS_SECRET_ACCESS_KEY");
        config.endpoint_scheme = get("S3_ENDPOINT_SCHEME");
        config.endpoint_host = get("S3_ENDPOINT_HOST");
        config.exclude_pattern = get("EXCLUDE_PATTERN");

        if let Some(value) = get("S3_FORCE_PATH_STYLE") {
            config.force_path_style = parse_bool("S3_FORCE_PATH_STYLE", &value)?;
        }
        if let Some(value) = get("SIGNED_URL_TTL") {
            config.url_ttl_secs = parse_number("SIGNED_URL_TTL", &value)?;
        }
        if let Some(value) = get("LIST_MAX_PAGES") {
            config.max_pages = Some(parse_number("LIST_MAX_PAGES", &value)?);
        }
        if let Some(value) = get("SIGN_CONCURRENCY") {
            config.sign_concurrency = parse_number("SIGN_CONCURRENCY", &value)?;
        }
        if let Some(value) = get("CACHE_MAX_AGE") {
            config.cache_max_age_secs = parse_number("CACHE_MAX_AGE", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the resolver cannot work with.
    pub fn validate(&self) -> Result<(), ExplorerError> {
        if self.bucket.trim().is_empty() {
            return Err(ExplorerError::config("bucket", "must not be empty"));
        }
        if self.url_ttl_secs == 0 {
            return Err(ExplorerError::config("url_ttl_secs", "must be positive"));
        }
        // SigV4 presigned URLs are capped at seven days.
        if self.url_ttl_secs > 7 * 24 * 3600 {
            return Err(ExplorerError::config(
                "url_ttl_secs",
                "must not exceed 604800 seconds",
            ));
        }
        if self.sign_concurrency == 0 {
            return Err(ExplorerError::config("sign_concurrency", "must be positive"));
        }
        if !(1..=1000).contains(&self.page_size) {
            return Err(ExplorerError::config("page_size", "must be within 1..=1000"));
        }
        if self.max_pages == Some(0) {
            return Err(ExplorerError::config("max_pages", "must be positive"));
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(ExplorerError::config(
                "access_key_id",
                "access key id and secret access key must be set together",
            ));
        }
        Ok(())
    }

    /// Custom endpoint URL for S3-compatible services, if configured.
    pub fn endpoint_url(&self) -> Option<String> {
        let host = self.endpoint_host.as_ref()?.trim();
        if host.is_empty() {
            return None;
        }
        let scheme = self.endpoint_scheme.as_deref().unwrap_or("https");
        Some(format!("{}://{}", scheme, host))
    }
}

fn parse_number<T: std::str::FromStr>(setting: &'static str, value: &str) -> Result<T, ExplorerError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ExplorerError::config(setting, format!("'{}': {}", value, e)))
}

fn parse_bool(setting: &'static str, value: &str) -> Result<bool, ExplorerError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ExplorerError::config(
            setting,
            format!("'{}' is not a boolean", value),
        )),
    }
}
